//! Gradient-boosted tree ensemble, evaluated from the booster's JSON tree dump.
//!
//! Only inference is supported. The dump is parsed once, validated, and
//! flattened into per-tree node arrays so evaluation is a tight loop over
//! indices.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Values within this distance of zero count as zero for `missing_type: "Zero"`.
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported objective {0:?}, expected \"binary sigmoid:<k>\"")]
    UnsupportedObjective(String),
    #[error("expected a single-output model, got num_class={0}")]
    MultiClass(usize),
    #[error("model has no trees")]
    Empty,
    #[error("tree {tree}: unknown decision type {value:?}")]
    DecisionType { tree: usize, value: String },
    #[error("tree {tree}: unknown missing type {value:?}")]
    MissingType { tree: usize, value: String },
    #[error("tree {tree}: bad categorical threshold {value:?}")]
    CategoricalThreshold { tree: usize, value: String },
    #[error("tree {tree}: split on feature {feature} but the model reads {width} features")]
    FeatureOutOfRange { tree: usize, feature: usize, width: usize },
    #[error("feature length mismatch: got {got}, expected {expected}")]
    InvalidInput { got: usize, expected: usize },
}

// ---------- Dump format ----------

#[derive(Debug, Deserialize)]
pub struct ModelDump {
    objective: String,
    #[serde(default = "single_class")]
    num_class: usize,
    #[serde(default)]
    max_feature_idx: Option<usize>,
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    average_output: bool,
    tree_info: Vec<TreeDump>,
    /// Category lists of the categorical columns as seen at fit time.
    #[serde(default)]
    pandas_categorical: Option<Vec<Vec<Value>>>,
}

fn single_class() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct TreeDump {
    tree_structure: NodeDump,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeDump {
    Split {
        split_feature: usize,
        threshold: ThresholdDump,
        decision_type: String,
        #[serde(default)]
        default_left: bool,
        #[serde(default = "no_missing")]
        missing_type: String,
        left_child: Box<NodeDump>,
        right_child: Box<NodeDump>,
    },
    Leaf {
        leaf_value: f64,
    },
}

fn no_missing() -> String {
    "None".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThresholdDump {
    Value(f64),
    Categories(String),
}

// ---------- Compiled trees ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingType {
    None,
    Zero,
    NaN,
}

impl MissingType {
    fn parse(tree: usize, value: &str) -> Result<Self, ModelError> {
        match value {
            "None" => Ok(Self::None),
            "Zero" => Ok(Self::Zero),
            "NaN" => Ok(Self::NaN),
            other => Err(ModelError::MissingType { tree, value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone)]
enum Decision {
    Numerical {
        threshold: f64,
        default_left: bool,
        missing: MissingType,
    },
    /// Sorted category codes routed to the left child.
    Categorical { codes: Vec<u32> },
}

impl Decision {
    fn parse(
        tree: usize,
        decision_type: &str,
        threshold: &ThresholdDump,
        default_left: bool,
        missing_type: &str,
    ) -> Result<Self, ModelError> {
        let missing = MissingType::parse(tree, missing_type)?;
        match (decision_type, threshold) {
            ("<=", ThresholdDump::Value(t)) => Ok(Self::Numerical {
                threshold: *t,
                default_left,
                missing,
            }),
            ("<=", ThresholdDump::Categories(s)) => {
                let threshold = s.trim().parse::<f64>().map_err(|_| {
                    ModelError::DecisionType { tree, value: format!("<= {s:?}") }
                })?;
                Ok(Self::Numerical { threshold, default_left, missing })
            }
            ("==", ThresholdDump::Categories(s)) => {
                let mut codes = s
                    .split("||")
                    .map(|c| c.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| ModelError::CategoricalThreshold { tree, value: s.clone() })?;
                codes.sort_unstable();
                codes.dedup();
                Ok(Self::Categorical { codes })
            }
            ("==", ThresholdDump::Value(v)) => {
                if v.fract() != 0.0 || *v < 0.0 || *v > u32::MAX as f64 {
                    return Err(ModelError::CategoricalThreshold { tree, value: v.to_string() });
                }
                Ok(Self::Categorical { codes: vec![*v as u32] })
            }
            (other, _) => Err(ModelError::DecisionType { tree, value: other.to_string() }),
        }
    }

    fn goes_left(&self, fval: f64) -> bool {
        match self {
            Self::Numerical { threshold, default_left, missing } => {
                let mut x = fval;
                if x.is_nan() && *missing != MissingType::NaN {
                    x = 0.0;
                }
                let take_default = match missing {
                    MissingType::Zero => x.abs() <= ZERO_THRESHOLD,
                    MissingType::NaN => x.is_nan(),
                    MissingType::None => false,
                };
                if take_default {
                    *default_left
                } else {
                    x <= *threshold
                }
            }
            Self::Categorical { codes } => {
                if fval.is_nan() {
                    return false;
                }
                // Truncate like an integer cast; negative codes never match.
                let code = fval as i64;
                u32::try_from(code).is_ok_and(|c| codes.binary_search(&c).is_ok())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        decision: Decision,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

/// One regression tree. The root is at index 0.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(index: usize, dump: &NodeDump) -> Result<Self, ModelError> {
        let mut nodes = Vec::new();
        push_node(index, dump, &mut nodes)?;
        Ok(Self { nodes })
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf(_) => None,
            })
            .max()
    }

    fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(v) => return *v,
                Node::Split { feature, decision, left, right } => {
                    idx = if decision.goes_left(row[*feature]) { *left } else { *right };
                }
            }
        }
    }

    fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }
}

fn push_node(tree: usize, dump: &NodeDump, nodes: &mut Vec<Node>) -> Result<usize, ModelError> {
    match dump {
        NodeDump::Leaf { leaf_value } => {
            nodes.push(Node::Leaf(*leaf_value));
            Ok(nodes.len() - 1)
        }
        NodeDump::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            missing_type,
            left_child,
            right_child,
        } => {
            let decision =
                Decision::parse(tree, decision_type, threshold, *default_left, missing_type)?;
            let at = nodes.len();
            // placeholder until both children have indices
            nodes.push(Node::Leaf(0.0));
            let left = push_node(tree, left_child, nodes)?;
            let right = push_node(tree, right_child, nodes)?;
            nodes[at] = Node::Split { feature: *split_feature, decision, left, right };
            Ok(at)
        }
    }
}

// ---------- Ensemble ----------

/// Binary classifier: sum of tree outputs pushed through a scaled sigmoid.
#[derive(Debug, Clone)]
pub struct Model {
    trees: Vec<Tree>,
    sigmoid: f64,
    average_output: bool,
    num_features: usize,
    feature_names: Vec<String>,
    training_categories: Option<Vec<Vec<Value>>>,
}

impl Model {
    pub fn from_dump(dump: ModelDump) -> Result<Self, ModelError> {
        let sigmoid = parse_binary_objective(&dump.objective)?;
        if dump.num_class != 1 {
            return Err(ModelError::MultiClass(dump.num_class));
        }
        if dump.tree_info.is_empty() {
            return Err(ModelError::Empty);
        }

        let trees = dump
            .tree_info
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::compile(i, &t.tree_structure))
            .collect::<Result<Vec<_>, _>>()?;

        let used = trees.iter().filter_map(Tree::max_feature).max().map_or(0, |m| m + 1);
        let num_features = match (dump.max_feature_idx, dump.feature_names.len()) {
            (Some(max), _) => max + 1,
            (None, 0) => used,
            (None, n) => n,
        };
        for (tree, t) in trees.iter().enumerate() {
            if let Some(feature) = t.max_feature() {
                if feature >= num_features {
                    return Err(ModelError::FeatureOutOfRange { tree, feature, width: num_features });
                }
            }
        }

        Ok(Self {
            trees,
            sigmoid,
            average_output: dump.average_output,
            num_features,
            feature_names: dump.feature_names,
            training_categories: dump.pandas_categorical,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.trees.iter().map(Tree::num_leaves).sum()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Column names recorded at training time; empty if the dump had none.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Per-column training categories, when the dump recorded them.
    pub fn training_categories(&self) -> Option<&[Vec<Value>]> {
        self.training_categories.as_deref()
    }

    /// Raw margin before the sigmoid.
    pub fn predict_raw(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.num_features {
            return Err(ModelError::InvalidInput { got: row.len(), expected: self.num_features });
        }
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(row)).sum();
        if self.average_output {
            Ok(sum / self.trees.len() as f64)
        } else {
            Ok(sum)
        }
    }

    /// `[P(class 0), P(class 1)]` for a single row.
    pub fn class_probabilities(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        let raw = self.predict_raw(row)?;
        let p = 1.0 / (1.0 + (-self.sigmoid * raw).exp());
        Ok([1.0 - p, p])
    }
}

fn parse_binary_objective(objective: &str) -> Result<f64, ModelError> {
    let mut parts = objective.split_whitespace();
    if parts.next() != Some("binary") {
        return Err(ModelError::UnsupportedObjective(objective.to_string()));
    }
    match parts.find_map(|p| p.strip_prefix("sigmoid:")) {
        Some(k) => k
            .parse::<f64>()
            .ok()
            .filter(|k| k.is_finite() && *k > 0.0)
            .ok_or_else(|| ModelError::UnsupportedObjective(objective.to_string())),
        None => Ok(1.0),
    }
}
