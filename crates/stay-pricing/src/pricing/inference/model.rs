use serde::{Deserialize, Serialize};

/// Anything that maps a transformed row to a log-price.
pub trait PriceModel: Send + Sync {
    fn predict(&self, row: &[f64]) -> f64;

    /// Number of inputs the model was fit on.
    fn input_width(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Fitted regressor as exported next to the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    Linear(LinearModel),
    GradientBoosting(GradientBoostedTrees),
}

impl RegressionModel {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RegressionModel::Linear(model) => model.validate(),
            RegressionModel::GradientBoosting(model) => model.validate(),
        }
    }

    fn inner(&self) -> &dyn PriceModel {
        match self {
            RegressionModel::Linear(model) => model as &dyn PriceModel,
            RegressionModel::GradientBoosting(model) => model,
        }
    }
}

impl PriceModel for RegressionModel {
    fn predict(&self, row: &[f64]) -> f64 {
        self.inner().predict(row)
    }

    fn input_width(&self) -> usize {
        self.inner().input_width()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    fn validate(&self) -> Result<(), String> {
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("linear model has a non-finite weight".to_string());
        }
        Ok(())
    }
}

impl PriceModel for LinearModel {
    fn predict(&self, row: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(row)
            .fold(self.intercept, |acc, (weight, value)| acc + weight * value)
    }

    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

/// Additive tree ensemble: `base_score + learning_rate * Σ tree(row)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub base_score: f64,
    pub learning_rate: f64,
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    fn validate(&self) -> Result<(), String> {
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err("gradient boosting model has a non-finite base score or rate".into());
        }
        if self.trees.is_empty() {
            return Err("gradient boosting model has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| format!("tree {idx}: {reason}"))?;
        }
        Ok(())
    }
}

impl PriceModel for GradientBoostedTrees {
    fn predict(&self, row: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|tree| tree.evaluate(row)).sum();
        self.base_score + self.learning_rate * boost
    }

    fn input_width(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "gradient_boosting"
    }
}

/// Flat node array; node 0 is the root. Rows with `row[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl RegressionTree {
    /// Children must point forward in the array, which rules out cycles.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} points to invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} is non-finite"));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn linear_model_is_intercept_plus_dot_product() {
        let model = LinearModel {
            intercept: 1.0,
            coefficients: vec![0.5, -2.0],
        };
        assert_eq!(model.predict(&[2.0, 0.25]), 1.5);
        assert_eq!(model.input_width(), 2);
    }

    #[test]
    fn boosted_trees_route_rows_and_scale_by_learning_rate() {
        let model = GradientBoostedTrees {
            base_score: 4.0,
            learning_rate: 0.5,
            n_features: 2,
            trees: vec![stump(0, 0.5, -1.0, 1.0), stump(1, 2.0, 0.0, 4.0)],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[1.0, 1.0]), 4.5);
        assert_eq!(model.predict(&[0.0, 3.0]), 5.5);
    }

    #[test]
    fn validation_rejects_backward_children_and_bad_features() {
        let mut looping = stump(0, 0.5, 1.0, 2.0);
        looping.nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(looping.validate(1).is_err());
        assert!(stump(3, 0.5, 1.0, 2.0).validate(2).is_err());
    }

    #[test]
    fn models_deserialize_from_tagged_json() {
        let json = r#"{
            "kind": "gradient_boosting",
            "base_score": 3.0,
            "learning_rate": 0.1,
            "n_features": 1,
            "trees": [{"nodes": [
                {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
                {"value": -1.0},
                {"value": 2.0}
            ]}]
        }"#;
        let model: RegressionModel = serde_json::from_str(json).expect("model parses");
        assert_eq!(model.name(), "gradient_boosting");
        assert!(model.validate().is_ok());
        assert!((model.predict(&[2.0]) - 3.2).abs() < 1e-12);
    }
}
