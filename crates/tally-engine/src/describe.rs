//! Read-only descriptors of a model's shape.

use serde::Serialize;
use std::fmt::Write;

use crate::model::{Model, NodeId, NodeKind};

/// The declared shape of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    /// The node's own name.
    pub name: String,
    /// Dotted path from the root.
    pub path: String,
    /// `group`, `accrual`, `payment` or `balance`.
    pub kind: NodeKind,
    /// Type name of the line item, for series nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Paths of declared reads; lagged reads are suffixed with `[-1]`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<String>,
    /// Children in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescriptor>,
}

impl NodeDescriptor {
    /// Number of nodes in this subtree, itself included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeDescriptor::count).sum::<usize>()
    }

    /// Renders the subtree as an indented outline.
    #[must_use]
    pub fn pretty(&self, indent: usize) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0, indent);
        out
    }

    fn write_pretty(&self, out: &mut String, level: usize, indent: usize) {
        let pad = " ".repeat(level * indent);
        let _ = write!(out, "{pad}{} ({})", self.name, self.kind);
        if let Some(item) = &self.item {
            let _ = write!(out, " = {item}");
        }
        if !self.reads.is_empty() {
            let _ = write!(out, " <- {}", self.reads.join(", "));
        }
        out.push('\n');
        for child in &self.children {
            child.write_pretty(out, level + 1, indent);
        }
    }
}

impl Model {
    /// Describes the subtree rooted at `node`.
    #[must_use]
    pub fn describe(&self, node: NodeId) -> NodeDescriptor {
        let reads = self
            .dependencies(node)
            .iter()
            .map(|dependency| {
                let path = self.path(dependency.node()).to_string();
                if dependency.is_lagged() {
                    format!("{path}[-1]")
                } else {
                    path
                }
            })
            .collect();

        NodeDescriptor {
            name: self.name(node).to_string(),
            path: self.path(node).to_string(),
            kind: self.kind(node).unwrap_or(NodeKind::Group),
            item: self
                .data(node)
                .and_then(|d| d.definition.as_ref())
                .map(|definition| definition.label().to_string()),
            reads,
            children: self
                .children(node)
                .iter()
                .map(|child| self.describe(*child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvalContext;
    use crate::item::{AccrualItem, Dependency};
    use crate::model::ModelBuilder;
    use tally_core::{AccrualSeries, TallyResult};

    struct Revenue;
    struct Costs(Vec<Dependency>);

    impl AccrualItem for Revenue {
        fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
            Ok(AccrualSeries::empty())
        }
    }

    impl AccrualItem for Costs {
        fn accruals(&self, _ctx: &EvalContext) -> TallyResult<AccrualSeries> {
            Ok(AccrualSeries::empty())
        }

        fn dependencies(&self) -> Vec<Dependency> {
            self.0.clone()
        }
    }

    fn model() -> Model {
        let mut builder = ModelBuilder::new("model");
        let is = builder.group(builder.root(), "income").unwrap();
        let revenue = builder.add_accrual(is, "revenue", Revenue).unwrap();
        builder
            .add_accrual(is, "costs", Costs(vec![Dependency::current(revenue)]))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_pretty_outline() {
        let model = model();
        let text = model.describe(model.root()).pretty(2);
        let expected = "\
model (group)
  income (group)
    revenue (accrual) = Revenue
    costs (accrual) = Costs <- model.income.revenue
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_json_shape() {
        let model = model();
        let descriptor = model.describe(model.root());
        assert_eq!(descriptor.count(), 4);
        let json = serde_json::to_value(&descriptor).unwrap();
        let costs = &json["children"][0]["children"][1];
        assert_eq!(costs["kind"], "accrual");
        assert_eq!(costs["reads"][0], "model.income.revenue");
        assert!(json.get("item").is_none());
    }
}
