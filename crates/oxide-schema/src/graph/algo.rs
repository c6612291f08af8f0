//! Navigation and ordering over the relationship graph.

use std::collections::HashSet;

use super::node::{RelationType, RelationshipNode};
use super::SchemaAst;

impl SchemaAst {
    /// Tables targeted by `table`'s outgoing relationships, without
    /// duplicates, in relationship order.
    #[must_use]
    pub fn dependencies(&self, table: &str) -> Vec<String> {
        let Some(node) = self.table(table) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.outgoing
            .iter()
            .filter_map(|name| self.relationship(name))
            .map(|rel| rel.to.table.clone())
            .filter(|target| seen.insert(target.clone()))
            .collect()
    }

    /// Tables whose outgoing relationships target `table`.
    #[must_use]
    pub fn dependent_tables(&self, table: &str) -> Vec<String> {
        let Some(node) = self.table(table) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.incoming
            .iter()
            .filter_map(|name| self.relationship(name))
            .map(|rel| rel.from.table.clone())
            .filter(|source| seen.insert(source.clone()))
            .collect()
    }

    /// First relationship going from `from` to `to`. Direction matters.
    #[must_use]
    pub fn get_relationship(&self, from: &str, to: &str) -> Option<&RelationshipNode> {
        self.relationships()
            .iter()
            .find(|r| r.from.table == from && r.to.table == to)
    }

    // ================================================================
    // Cycles
    // ================================================================

    /// Finds dependency cycles.
    ///
    /// Depth-first search from every table. Reaching a table that is
    /// already on the current path records the path from that table onward
    /// as one cycle. A self-referencing table is a one-table cycle.
    #[must_use]
    pub fn detect_circular_dependencies(&self) -> Vec<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();
        for table in self.tables() {
            self.walk_cycles(&table.name, &mut visited, &mut stack, &mut cycles);
        }
        cycles
    }

    fn walk_cycles(
        &self,
        table: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if let Some(start) = stack.iter().position(|t| t == table) {
            cycles.push(stack[start..].to_vec());
            return;
        }
        if visited.contains(table) {
            return;
        }
        stack.push(table.to_string());
        for dependency in self.dependencies(table) {
            if self.has_table(&dependency) {
                self.walk_cycles(&dependency, visited, stack, cycles);
            }
        }
        stack.pop();
        visited.insert(table.to_string());
    }

    /// Returns `true` if [`SchemaAst::detect_circular_dependencies`] finds anything.
    #[must_use]
    pub fn has_circular_dependencies(&self) -> bool {
        !self.detect_circular_dependencies().is_empty()
    }

    // ================================================================
    // Ordering
    // ================================================================

    /// Table names with every dependency before its dependents.
    ///
    /// Post-order DFS. Terminates on cycles, but the relative order of
    /// tables inside a cycle cannot satisfy every edge; check
    /// [`SchemaAst::has_circular_dependencies`] first when that matters.
    #[must_use]
    pub fn create_order(&self) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.tables().len());
        for table in self.tables() {
            self.walk_order(&table.name, &mut visited, &mut order);
        }
        order
    }

    fn walk_order(&self, table: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(table.to_string()) {
            return;
        }
        for dependency in self.dependencies(table) {
            if self.has_table(&dependency) {
                self.walk_order(&dependency, visited, order);
            }
        }
        order.push(table.to_string());
    }

    /// Exact reverse of [`SchemaAst::create_order`].
    #[must_use]
    pub fn drop_order(&self) -> Vec<String> {
        let mut order = self.create_order();
        order.reverse();
        order
    }

    // ================================================================
    // Inference
    // ================================================================

    /// Heuristic: does this table only exist to join two other tables?
    ///
    /// Requires exactly two outgoing relationships and either at most five
    /// columns, or at most six columns with a table name that mentions both
    /// related tables (singular or plural).
    #[must_use]
    pub fn is_junction_table(&self, table: &str) -> bool {
        let Some(node) = self.table(table) else {
            return false;
        };
        if node.outgoing.len() != 2 {
            return false;
        }
        let column_count = node.columns().len();
        if column_count <= 5 {
            return true;
        }
        if column_count > 6 {
            return false;
        }
        let name = node.name.to_lowercase();
        node.outgoing
            .iter()
            .filter_map(|r| self.relationship(r))
            .all(|rel| mentions(&name, &rel.to.table.to_lowercase()))
    }

    /// Infers the cardinality of a relationship from the graph shape.
    ///
    /// Many-to-many when the source is a junction table, one-to-one when
    /// the source columns are unique, many-to-one otherwise.
    #[must_use]
    pub fn infer_relation_type(&self, relationship: &RelationshipNode) -> RelationType {
        if self.is_junction_table(&relationship.from.table) {
            return RelationType::ManyToMany;
        }
        let unique_source = self.table(&relationship.from.table).is_some_and(|t| {
            !relationship.from.columns.is_empty()
                && relationship
                    .from
                    .columns
                    .iter()
                    .all(|c| t.column(c).is_some_and(|col| col.is_unique))
        });
        if unique_source {
            RelationType::OneToOne
        } else {
            RelationType::ManyToOne
        }
    }
}

fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = word.strip_suffix("ses") {
        format!("{stem}s")
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}

fn plural(word: &str) -> String {
    if word.ends_with('s') {
        word.to_string()
    } else if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else {
        format!("{word}s")
    }
}

fn mentions(name: &str, table: &str) -> bool {
    name.contains(table) || name.contains(&singular(table)) || name.contains(&plural(table))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{blog, fk};
    use super::super::{ColumnNode, TableNode};
    use super::*;
    use crate::types::CanonicalType;

    fn position(order: &[String], table: &str) -> usize {
        order.iter().position(|t| t == table).unwrap()
    }

    fn table_with(name: &str, columns: &[&str]) -> TableNode {
        let mut table = TableNode::new(name);
        for column in columns {
            table
                .add_column(ColumnNode::new(*column, CanonicalType::integer()))
                .unwrap();
        }
        table
    }

    fn junction_schema(name: &str, extra_columns: usize) -> SchemaAst {
        let mut schema = SchemaAst::new();
        schema.add_table(table_with("users", &["id"])).unwrap();
        schema.add_table(table_with("roles", &["id"])).unwrap();
        let mut columns = vec!["user_id".to_string(), "role_id".to_string()];
        columns.extend((0..extra_columns).map(|i| format!("extra_{i}")));
        let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        schema.add_table(table_with(name, &refs)).unwrap();
        schema
            .add_relationship(fk("fk_j_user", name, "user_id", "users", "id"))
            .unwrap();
        schema
            .add_relationship(fk("fk_j_role", name, "role_id", "roles", "id"))
            .unwrap();
        schema
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let schema = blog();
        assert_eq!(schema.dependencies("comments"), vec!["posts", "users"]);
        assert_eq!(schema.dependencies("users"), Vec::<String>::new());
        assert_eq!(schema.dependent_tables("users"), vec!["posts", "comments"]);
        assert!(schema.dependencies("ghosts").is_empty());
    }

    #[test]
    fn test_get_relationship_is_directional() {
        let schema = blog();
        assert_eq!(
            schema.get_relationship("posts", "users").unwrap().name,
            "fk_posts_author_id"
        );
        assert!(schema.get_relationship("users", "posts").is_none());
    }

    #[test]
    fn test_create_order_respects_dependencies() {
        let schema = blog();
        let order = schema.create_order();
        assert_eq!(order.len(), 3);
        assert!(position(&order, "users") < position(&order, "posts"));
        assert!(position(&order, "posts") < position(&order, "comments"));

        let mut reversed = schema.drop_order();
        reversed.reverse();
        assert_eq!(reversed, order);
    }

    #[test]
    fn test_create_order_independent_of_insertion() {
        let mut schema = SchemaAst::new();
        schema.add_table(table_with("c", &["b_id"])).unwrap();
        schema.add_table(table_with("b", &["id", "a_id"])).unwrap();
        schema.add_table(table_with("a", &["id"])).unwrap();
        schema.add_relationship(fk("fk_c", "c", "b_id", "b", "id")).unwrap();
        schema.add_relationship(fk("fk_b", "b", "a_id", "a", "id")).unwrap();
        assert_eq!(schema.create_order(), vec!["a", "b", "c"]);
        assert_eq!(schema.drop_order(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_mutual_foreign_keys_form_a_cycle() {
        let mut schema = SchemaAst::new();
        schema.add_table(table_with("a", &["id", "b_id"])).unwrap();
        schema.add_table(table_with("b", &["id", "a_id"])).unwrap();
        schema.add_relationship(fk("fk_a_b", "a", "b_id", "b", "id")).unwrap();
        schema.add_relationship(fk("fk_b_a", "b", "a_id", "a", "id")).unwrap();

        let cycles = schema.detect_circular_dependencies();
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
        assert!(schema.has_circular_dependencies());
        assert_eq!(schema.create_order().len(), 2);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut schema = SchemaAst::new();
        schema
            .add_table(table_with("categories", &["id", "parent_id"]))
            .unwrap();
        schema
            .add_relationship(fk("fk_parent", "categories", "parent_id", "categories", "id"))
            .unwrap();
        assert_eq!(
            schema.detect_circular_dependencies(),
            vec![vec!["categories".to_string()]]
        );
        assert_eq!(schema.create_order(), vec!["categories"]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let schema = blog();
        assert!(schema.detect_circular_dependencies().is_empty());
        assert!(!schema.has_circular_dependencies());
    }

    #[test]
    fn test_junction_table_by_column_count() {
        assert!(junction_schema("memberships", 0).is_junction_table("memberships"));
        assert!(junction_schema("memberships", 3).is_junction_table("memberships"));
        assert!(!junction_schema("memberships", 8).is_junction_table("memberships"));
    }

    #[test]
    fn test_junction_table_by_name() {
        // six columns: only accepted when the name mentions both tables
        assert!(junction_schema("user_roles", 4).is_junction_table("user_roles"));
        assert!(!junction_schema("memberships", 4).is_junction_table("memberships"));
    }

    #[test]
    fn test_infer_relation_type() {
        let schema = junction_schema("user_roles", 0);
        let rel = schema.relationship("fk_j_user").unwrap();
        assert_eq!(schema.infer_relation_type(rel), RelationType::ManyToMany);

        let mut schema = blog();
        let rel = schema.relationship("fk_posts_author_id").unwrap();
        assert_eq!(schema.infer_relation_type(rel), RelationType::ManyToOne);

        schema
            .add_table(
                TableNode::new("profiles")
                    .with_column(ColumnNode::new("user_id", CanonicalType::integer()).unique())
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_relationship(fk("fk_profiles_user_id", "profiles", "user_id", "users", "id"))
            .unwrap();
        let rel = schema.relationship("fk_profiles_user_id").unwrap();
        assert_eq!(schema.infer_relation_type(rel), RelationType::OneToOne);
    }

    #[test]
    fn test_singular_and_plural() {
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("users"), "user");
        assert_eq!(singular("addresses"), "address");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("user"), "users");
    }
}
