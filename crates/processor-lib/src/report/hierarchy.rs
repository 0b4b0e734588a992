//! Namespace → deployment → container grouping over a report table
//!
//! Built in one pass; groups hold row indices into the owning table.
//! Namespaces and deployments keep first-appearance order so repeated runs
//! over the same table visit deployments in the same order.

use std::collections::HashMap;

use super::table::{ReportRow, ReportTable};

#[derive(Debug)]
struct DeploymentGroup<'a> {
    name: &'a str,
    rows: Vec<usize>,
}

#[derive(Debug)]
struct NamespaceGroup<'a> {
    name: &'a str,
    deployments: Vec<DeploymentGroup<'a>>,
}

/// One (namespace, deployment) unit of work with its container rows
#[derive(Debug, Clone)]
pub struct DeploymentUnit<'a> {
    pub namespace: &'a str,
    pub deployment: &'a str,
    pub rows: Vec<&'a ReportRow>,
}

#[derive(Debug)]
pub struct Hierarchy<'a> {
    table: &'a ReportTable,
    namespaces: Vec<NamespaceGroup<'a>>,
}

impl<'a> Hierarchy<'a> {
    pub fn new(table: &'a ReportTable) -> Self {
        let mut namespaces: Vec<NamespaceGroup<'a>> = Vec::new();
        let mut namespace_index: HashMap<&'a str, usize> = HashMap::new();
        let mut deployment_index: HashMap<(&'a str, &'a str), usize> = HashMap::new();

        for (row_index, row) in table.rows().iter().enumerate() {
            let ns = row.namespace.as_str();
            let dep = row.deployment_name.as_str();

            let ns_pos = *namespace_index.entry(ns).or_insert_with(|| {
                namespaces.push(NamespaceGroup {
                    name: ns,
                    deployments: Vec::new(),
                });
                namespaces.len() - 1
            });

            let group = &mut namespaces[ns_pos];
            let dep_pos = *deployment_index.entry((ns, dep)).or_insert_with(|| {
                group.deployments.push(DeploymentGroup {
                    name: dep,
                    rows: Vec::new(),
                });
                group.deployments.len() - 1
            });

            group.deployments[dep_pos].rows.push(row_index);
        }

        Self { table, namespaces }
    }

    /// Distinct namespaces
    pub fn namespaces(&self) -> Vec<&'a str> {
        self.namespaces.iter().map(|ns| ns.name).collect()
    }

    /// Distinct deployments within a namespace; empty for unknown namespaces
    pub fn deployments(&self, namespace: &str) -> Vec<&'a str> {
        self.namespace(namespace)
            .map(|ns| ns.deployments.iter().map(|d| d.name).collect())
            .unwrap_or_default()
    }

    /// Rows of one deployment in original file order
    pub fn container_rows(&self, namespace: &str, deployment: &str) -> Vec<&'a ReportRow> {
        self.namespace(namespace)
            .and_then(|ns| ns.deployments.iter().find(|d| d.name == deployment))
            .map(|d| self.resolve(&d.rows))
            .unwrap_or_default()
    }

    /// Every (namespace, deployment) pair with its rows
    pub fn units(&self) -> Vec<DeploymentUnit<'a>> {
        self.namespaces
            .iter()
            .flat_map(|ns| {
                ns.deployments.iter().map(move |d| DeploymentUnit {
                    namespace: ns.name,
                    deployment: d.name,
                    rows: self.resolve(&d.rows),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    fn namespace(&self, name: &str) -> Option<&NamespaceGroup<'a>> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    fn resolve(&self, indices: &[usize]) -> Vec<&'a ReportRow> {
        let table: &'a ReportTable = self.table;
        let rows = table.rows();
        indices.iter().map(|&i| &rows[i]).collect()
    }
}
