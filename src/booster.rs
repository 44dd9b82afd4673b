//! Gradient-boosted tree ensembles loaded from XGBoost JSON or UBJSON model
//! files.
//!
//! Only what binary classifiers need is supported: the `gbtree` booster,
//! numerical splits, and the logistic / raw-margin / hinge objectives.
//! Anything else is rejected at load time so a bad artifact stops startup
//! instead of producing silent garbage.

use crate::ubjson;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Decision threshold applied to the transformed score.
const CLASS_THRESHOLD: f32 = 0.5;

// ============ On-disk document ============

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDocument,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct LearnerDocument {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterDocument,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveDocument,
}

#[derive(Debug, Deserialize)]
struct BoosterDocument {
    name: String,
    model: Option<GbtreeDocument>,
}

#[derive(Debug, Deserialize)]
struct GbtreeDocument {
    #[serde(default)]
    gbtree_model_param: GbtreeModelParam,
    trees: Vec<TreeDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct GbtreeModelParam {
    num_parallel_tree: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    num_feature: String,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDocument {
    name: String,
}

/// Older exports write flags as booleans, newer ones as 0/1.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

impl FlagRepr {
    fn is_set(self) -> bool {
        match self {
            FlagRepr::Bool(b) => b,
            FlagRepr::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeDocument {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<FlagRepr>,
    #[serde(default)]
    split_type: Vec<FlagRepr>,
}

// ============ Compiled model ============

/// How the summed margin becomes the score compared against 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic` / `reg:logistic`: sigmoid of the margin.
    Logistic,
    /// `binary:logitraw`: the margin itself.
    LogitRaw,
    /// `binary:hinge`: 1 when the margin is positive.
    Hinge,
}

impl Objective {
    pub fn name(self) -> &'static str {
        match self {
            Objective::Logistic => "binary:logistic",
            Objective::LogitRaw => "binary:logitraw",
            Objective::Hinge => "binary:hinge",
        }
    }

    fn from_name(name: &str) -> anyhow::Result<Self> {
        match name {
            "binary:logistic" | "reg:logistic" => Ok(Objective::Logistic),
            "binary:logitraw" => Ok(Objective::LogitRaw),
            "binary:hinge" => Ok(Objective::Hinge),
            other => bail!("unsupported objective '{}'", other),
        }
    }

    /// Converts the stored `base_score` into a starting margin.
    fn base_margin(self, base_score: f32) -> anyhow::Result<f32> {
        match self {
            Objective::Logistic => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    bail!(
                        "base_score {} must lie strictly between 0 and 1 for a logistic objective",
                        base_score
                    );
                }
                Ok((base_score / (1.0 - base_score)).ln())
            }
            Objective::LogitRaw | Objective::Hinge => Ok(base_score),
        }
    }

    fn transform(self, margin: f32) -> f32 {
        match self {
            Objective::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Objective::LogitRaw => margin,
            Objective::Hinge => {
                if margin > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold, or the leaf value when `left == -1`.
    value: f32,
    default_left: bool,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left == -1
    }
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(doc: TreeDocument, num_features: usize) -> anyhow::Result<Self> {
        let n = doc.left_children.len();
        if n == 0 {
            bail!("tree has no nodes");
        }
        let lengths = [
            doc.right_children.len(),
            doc.split_indices.len(),
            doc.split_conditions.len(),
            doc.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            bail!("tree node arrays disagree in length ({} nodes)", n);
        }
        if doc.split_type.iter().any(|t| t.is_set()) {
            bail!("categorical splits are not supported");
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (doc.left_children[i], doc.right_children[i]);
            let leaf = left == -1;
            if leaf != (right == -1) {
                bail!("node {} has exactly one child", i);
            }
            if !leaf {
                // Children always follow their parent, which also rules out cycles.
                for child in [left, right] {
                    if child <= i as i32 || child as usize >= n {
                        bail!("node {} points at invalid child {}", i, child);
                    }
                }
            }
            let feature = doc.split_indices[i];
            if !leaf && (feature < 0 || feature as usize >= num_features) {
                bail!(
                    "node {} splits on feature {} but the model has {} features",
                    i,
                    feature,
                    num_features
                );
            }
            nodes.push(Node {
                left,
                right,
                feature: feature.max(0) as usize,
                value: doc.split_conditions[i],
                default_left: doc.default_left[i].is_set(),
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node.value;
            }
            let x = features.get(node.feature).copied().unwrap_or(f32::NAN);
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x < node.value
            };
            let next = if go_left { node.left } else { node.right };
            idx = next as usize;
        }
    }
}

/// A loaded binary tree-ensemble classifier.
#[derive(Debug, Clone)]
pub struct BoostedTrees {
    trees: Vec<Tree>,
    /// Trees actually summed at prediction time (early-stopping aware).
    active_trees: usize,
    base_margin: f32,
    objective: Objective,
    num_features: usize,
    feature_names: Vec<String>,
    version: Vec<u32>,
}

impl BoostedTrees {
    /// Parses an XGBoost JSON model document.
    pub fn from_json_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let doc: ModelDocument =
            serde_json::from_slice(bytes).context("model is not a valid XGBoost JSON document")?;
        Self::compile(doc)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Self::from_json_slice(json.as_bytes())
    }

    /// Parses an XGBoost UBJSON model document (`.ubj`, or `.xgb` from 2.1 on).
    pub fn from_ubjson_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let value = ubjson::decode(bytes).context("model is not valid UBJSON")?;
        let doc: ModelDocument = serde_json::from_value(value)
            .context("model is not a valid XGBoost UBJSON document")?;
        Self::compile(doc)
    }

    /// Parses a model in either JSON or UBJSON encoding, whatever the file
    /// is named.
    ///
    /// The pre-1.0 binary format has no schema and is refused with the
    /// re-export step spelled out.
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let body = &bytes[start..];
        if body.is_empty() {
            bail!("model file is empty");
        }
        if ubjson::looks_like_ubjson(body) {
            Self::from_ubjson_slice(body)
        } else if body.first() == Some(&b'{') {
            Self::from_json_slice(body)
        } else {
            bail!(
                "model is in XGBoost's legacy binary format; load it in Python and re-export \
                 with booster.save_model(\"<name>.json\") or save_model(\"<name>.ubj\")"
            )
        }
    }

    fn compile(doc: ModelDocument) -> anyhow::Result<Self> {
        let learner = doc.learner;
        let params = &learner.learner_model_param;

        let num_class: u32 = parse_param("num_class", params.num_class.as_deref().unwrap_or("0"))?;
        if num_class > 1 {
            bail!("multi-class models are not supported (num_class = {})", num_class);
        }
        let num_target: u32 =
            parse_param("num_target", params.num_target.as_deref().unwrap_or("1"))?;
        if num_target > 1 {
            bail!("multi-target models are not supported (num_target = {})", num_target);
        }
        let num_features: usize = parse_param("num_feature", &params.num_feature)?;
        // Newer exports store the base score as a one-element list: "[5E-1]".
        let base_score: f32 = parse_param(
            "base_score",
            params.base_score.trim_matches(|c| c == '[' || c == ']'),
        )?;

        let objective = Objective::from_name(&learner.objective.name)?;
        let base_margin = objective.base_margin(base_score)?;

        let booster = learner.gradient_booster;
        if booster.name != "gbtree" {
            bail!("unsupported booster '{}'", booster.name);
        }
        let model = booster
            .model
            .ok_or_else(|| anyhow!("gbtree booster has no model section"))?;
        let per_round: usize = parse_param(
            "num_parallel_tree",
            model
                .gbtree_model_param
                .num_parallel_tree
                .as_deref()
                .unwrap_or("1"),
        )?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::compile(t, num_features).with_context(|| format!("tree {}", i)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if trees.is_empty() {
            bail!("model contains no trees");
        }

        let active_trees = match learner.attributes.get("best_iteration") {
            Some(raw) => {
                let best: usize = parse_param("best_iteration", raw)?;
                ((best + 1) * per_round.max(1)).min(trees.len())
            }
            None => trees.len(),
        };

        Ok(Self {
            trees,
            active_trees,
            base_margin,
            objective,
            num_features,
            feature_names: learner.feature_names,
            version: doc.version,
        })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn active_trees(&self) -> usize {
        self.active_trees
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Column names recorded by the training library, if any.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Library version that wrote the model, e.g. `2.0.3`.
    pub fn version(&self) -> Option<String> {
        if self.version.is_empty() {
            return None;
        }
        Some(
            self.version
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    /// Raw summed margin. Missing trailing features are treated as missing values.
    pub fn margin(&self, features: &[f32]) -> f32 {
        self.trees[..self.active_trees]
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(features))
    }

    /// Objective-transformed score (a probability for logistic models).
    pub fn score(&self, features: &[f32]) -> f32 {
        self.objective.transform(self.margin(features))
    }

    /// Predicted class, 0 or 1.
    pub fn predict_class(&self, features: &[f32]) -> u8 {
        u8::from(self.score(features) > CLASS_THRESHOLD)
    }
}

fn parse_param<T: FromStr>(name: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow!("invalid model parameter {} = '{}'", name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// One stump on feature 0 (< 10 goes left, missing goes right) and one
    /// depth-2 tree on features 1 and 2.
    fn model_json(objective: &str, base_score: &str) -> serde_json::Value {
        json!({
            "learner": {
                "attributes": {},
                "feature_names": ["a", "b", "c"],
                "feature_types": ["float", "float", "float"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "2"},
                        "iteration_indptr": [0, 1, 2],
                        "tree_info": [0, 0],
                        "trees": [
                            {
                                "id": 0,
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "parents": [2147483647, 0, 0],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [10.0, -0.4, 0.6],
                                "split_type": [0, 0, 0],
                                "default_left": [0, 0, 0],
                                "base_weights": [0.1, -0.4, 0.6],
                                "loss_changes": [3.2, 0.0, 0.0],
                                "sum_hessian": [5.0, 2.5, 2.5],
                                "categories": [],
                                "categories_nodes": [],
                                "categories_segments": [],
                                "categories_sizes": [],
                                "tree_param": {"num_deleted": "0", "num_feature": "3", "num_nodes": "3", "size_leaf_vector": "1"}
                            },
                            {
                                "id": 1,
                                "left_children": [1, 3, -1, -1, -1],
                                "right_children": [2, 4, -1, -1, -1],
                                "parents": [2147483647, 0, 0, 1, 1],
                                "split_indices": [1, 2, 0, 0, 0],
                                "split_conditions": [0.5, 100.0, 0.3, -0.2, 0.2],
                                "split_type": [0, 0, 0, 0, 0],
                                "default_left": [true, false, false, false, false],
                                "tree_param": {"num_deleted": "0", "num_feature": "3", "num_nodes": "5", "size_leaf_vector": "1"}
                            }
                        ]
                    }
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "boost_from_average": "1",
                    "num_class": "0",
                    "num_feature": "3",
                    "num_target": "1"
                },
                "objective": {"name": objective, "reg_loss_param": {"scale_pos_weight": "1"}}
            },
            "version": [2, 0, 3]
        })
    }

    fn load(value: serde_json::Value) -> anyhow::Result<BoostedTrees> {
        BoostedTrees::from_json_str(&value.to_string())
    }

    #[test]
    fn test_margin_walks_every_tree() {
        let model = load(model_json("binary:logistic", "5E-1")).unwrap();
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.num_features(), 3);
        assert_eq!(model.version().as_deref(), Some("2.0.3"));

        // a < 10 -> -0.4; b < 0.5 and c < 100 -> -0.2
        assert!((model.margin(&[1.0, 0.0, 50.0]) - (-0.6)).abs() < 1e-6);
        assert_eq!(model.predict_class(&[1.0, 0.0, 50.0]), 0);
        // a >= 10 -> 0.6; b >= 0.5 -> 0.3
        assert!((model.margin(&[12.0, 1.0, 0.0]) - 0.9).abs() < 1e-6);
        assert_eq!(model.predict_class(&[12.0, 1.0, 0.0]), 1);
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        let model = load(model_json("binary:logistic", "0.5")).unwrap();
        // a missing -> right (0.6); b missing -> left, c >= 100 -> 0.2
        let margin = model.margin(&[f32::NAN, f32::NAN, 150.0]);
        assert!((margin - 0.8).abs() < 1e-6);
        // short input behaves as trailing missing values: c missing -> right (0.2)
        assert!((model.margin(&[f32::NAN]) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_base_score_shifts_logistic_margin() {
        let model = load(model_json("binary:logistic", "[2.5E-1]")).unwrap();
        let expected = (0.25f32 / 0.75).ln() - 0.6;
        assert!((model.margin(&[1.0, 0.0, 50.0]) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_logitraw_thresholds_raw_margin() {
        let model = load(model_json("binary:logitraw", "0")).unwrap();
        assert_eq!(model.objective(), Objective::LogitRaw);
        // margin 0.9 > 0.5
        assert_eq!(model.predict_class(&[12.0, 1.0, 0.0]), 1);
        // margin 0.6 - 0.2 = 0.4 is positive but below the threshold
        assert_eq!(model.predict_class(&[12.0, 0.0, 50.0]), 0);
    }

    #[test]
    fn test_best_iteration_limits_trees() {
        let mut doc = model_json("binary:logistic", "0.5");
        doc["learner"]["attributes"] = json!({"best_iteration": "0", "best_score": "0.1"});
        let model = load(doc).unwrap();
        assert_eq!(model.active_trees(), 1);
        assert!((model.margin(&[12.0, 1.0, 0.0]) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_unsupported_models() {
        let mut multi = model_json("multi:softprob", "0.5");
        multi["learner"]["learner_model_param"]["num_class"] = json!("3");
        assert!(load(multi).is_err());

        assert!(load(model_json("reg:squarederror", "0.5")).is_err());

        let mut bad_index = model_json("binary:logistic", "0.5");
        bad_index["learner"]["gradient_booster"]["model"]["trees"][0]["split_indices"] =
            json!([7, 0, 0]);
        assert!(load(bad_index).is_err());

        let mut cycle = model_json("binary:logistic", "0.5");
        cycle["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] =
            json!([0, -1, -1]);
        assert!(load(cycle).is_err());

        assert!(BoostedTrees::from_json_str("not json").is_err());
    }

    #[test]
    fn test_hinge_predicts_on_margin_sign() {
        let model = load(model_json("binary:hinge", "0")).unwrap();
        // margin 0.4 is positive
        assert_eq!(model.predict_class(&[12.0, 0.0, 50.0]), 1);
        assert_eq!(model.predict_class(&[1.0, 0.0, 50.0]), 0);
    }

    /// Plain (unoptimized) UBJSON writer for building binary test models.
    fn to_ubjson(value: &serde_json::Value, out: &mut Vec<u8>) {
        fn write_str(s: &str, out: &mut Vec<u8>) {
            out.push(b'L');
            out.extend((s.len() as i64).to_be_bytes());
            out.extend(s.as_bytes());
        }
        match value {
            serde_json::Value::Null => out.push(b'Z'),
            serde_json::Value::Bool(b) => out.push(if *b { b'T' } else { b'F' }),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => {
                    out.push(b'L');
                    out.extend(i.to_be_bytes());
                }
                None => {
                    out.push(b'D');
                    out.extend(n.as_f64().unwrap().to_be_bytes());
                }
            },
            serde_json::Value::String(s) => {
                out.push(b'S');
                write_str(s, out);
            }
            serde_json::Value::Array(items) => {
                out.push(b'[');
                items.iter().for_each(|v| to_ubjson(v, out));
                out.push(b']');
            }
            serde_json::Value::Object(map) => {
                out.push(b'{');
                for (k, v) in map {
                    write_str(k, out);
                    to_ubjson(v, out);
                }
                out.push(b'}');
            }
        }
    }

    #[test]
    fn test_ubjson_model_matches_json_model() {
        let doc = model_json("binary:logistic", "[5E-1]");
        let mut bytes = Vec::new();
        to_ubjson(&doc, &mut bytes);

        let binary = BoostedTrees::from_slice(&bytes).unwrap();
        let text = BoostedTrees::from_slice(doc.to_string().as_bytes()).unwrap();
        assert_eq!(binary.num_trees(), 2);
        for row in [[1.0, 0.0, 50.0], [12.0, 1.0, 0.0], [f32::NAN, f32::NAN, 150.0]] {
            assert_eq!(binary.margin(&row), text.margin(&row));
        }
    }

    #[test]
    fn test_legacy_binary_names_the_re_export() {
        let err = BoostedTrees::from_slice(b"binf\x00\x00\x00\x3f").unwrap_err();
        assert!(err.to_string().contains("save_model"));
        assert!(BoostedTrees::from_slice(b"").is_err());
    }
}
