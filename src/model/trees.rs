//! Gradient-boosted tree ensemble with a binary logistic objective.
//!
//! Each tree is a flat node list rooted at index 0. A split sends
//! `x[feature] < threshold` to `left`, everything else to `right`. The
//! margin is `base_margin` plus one leaf per tree, and
//! `p(class 1) = sigmoid(margin)`.

use serde::{Deserialize, Serialize};

use super::logistic::sigmoid;
use super::{Classifier, ClassifierError};
use crate::artifacts::ArtifactError;
use crate::features::{ScaledFeatureVector, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Children must come after their parent, which rules out cycles.
    fn validate(&self, tree: usize) -> Result<(), ArtifactError> {
        let invalid = |reason: String| ArtifactError::Invalid {
            artifact: "tree ensemble",
            reason: format!("tree {}: {}", tree, reason),
        };

        if self.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(invalid(format!("node {} splits on feature {}", i, feature)));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite threshold", i)));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(invalid(format!("node {} points to node {}", i, child)));
                        }
                    }
                }
                Node::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite leaf", i)));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &[f64]) -> Result<f64, ClassifierError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { leaf }) => return Ok(*leaf),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).copied().ok_or_else(|| {
                        ClassifierError(format!("split on feature {} beyond input", feature))
                    })?;
                    let next = if value < *threshold { *left } else { *right };
                    if next <= index {
                        return Err(ClassifierError(format!("tree loops back at node {}", index)));
                    }
                    index = next;
                }
                None => return Err(ClassifierError(format!("missing tree node {}", index))),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid {
                artifact: "tree ensemble",
                reason: "no trees".to_string(),
            });
        }
        if !self.base_margin.is_finite() {
            return Err(ArtifactError::Invalid {
                artifact: "tree ensemble",
                reason: "non-finite base margin".to_string(),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }

    /// Raw margin before the sigmoid.
    pub fn margin(&self, x: &ScaledFeatureVector) -> Result<f64, ClassifierError> {
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.leaf_value(x.as_slice())?;
        }
        Ok(margin)
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }

    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    fn n_classes(&self) -> usize {
        2
    }

    fn predict_proba(&self, x: &ScaledFeatureVector) -> Result<Vec<f64>, ClassifierError> {
        let p = sigmoid(self.margin(x)?);
        Ok(vec![1.0 - p, p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, below: f64, above: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { leaf: below },
                Node::Leaf { leaf: above },
            ],
        }
    }

    fn x_with(index: usize, value: f64) -> ScaledFeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[index] = value;
        ScaledFeatureVector::from_values(values)
    }

    #[test]
    fn test_parse_flat_nodes() {
        let json = r#"{
            "base_margin": 0.0,
            "trees": [{"nodes": [
                {"feature": 8, "threshold": 0.5, "left": 1, "right": 2},
                {"leaf": -1.0},
                {"leaf": 1.0}
            ]}]
        }"#;
        let model: TreeEnsemble = serde_json::from_str(json).unwrap();
        model.validate().unwrap();
        assert_eq!(model.trees[0], stump(8, 0.5, -1.0, 1.0));
    }

    #[test]
    fn test_margin_sums_leaves() {
        let model = TreeEnsemble {
            feature_names: Vec::new(),
            base_margin: 0.25,
            trees: vec![stump(8, 0.5, -1.0, 1.0), stump(11, 0.0, 0.5, -0.5)],
        };
        model.validate().unwrap();

        // serror_rate high, same_srv_rate at threshold goes right
        let m = model.margin(&x_with(8, 2.0)).unwrap();
        assert!((m - (0.25 + 1.0 - 0.5)).abs() < 1e-12);

        let c = model.classify(&x_with(8, 2.0)).unwrap();
        assert_eq!(c.class_id, 1);
        assert!((c.probabilities[1] - sigmoid(0.75)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_margin_favours_class_zero() {
        let model = TreeEnsemble {
            feature_names: Vec::new(),
            base_margin: 0.0,
            trees: vec![Tree {
                nodes: vec![Node::Leaf { leaf: 0.0 }],
            }],
        };
        let c = model.classify(&x_with(0, 0.0)).unwrap();
        assert_eq!(c.class_id, 0);
        assert_eq!(c.probabilities, vec![0.5, 0.5]);
    }

    #[test]
    fn test_validate_rejects_back_edges() {
        let model = TreeEnsemble {
            feature_names: Vec::new(),
            base_margin: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 1,
                    },
                    Node::Leaf { leaf: 0.0 },
                ],
            }],
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_feature() {
        let model = TreeEnsemble {
            feature_names: Vec::new(),
            base_margin: 0.0,
            trees: vec![stump(FEATURE_COUNT, 0.0, 0.0, 0.0)],
        };
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("feature 15"));
    }
}
