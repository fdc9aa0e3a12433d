use crate::render_plan::{
    and_combine, FilterItems, FlatQuery, FromTableItem, GroupByExpressions, Join, JoinItems,
    OrderByItems, SelectItems, ToSql,
};

impl ToSql for FlatQuery {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str(&self.select.to_sql());
        sql.push_str(&self.from.to_sql());
        sql.push_str(&self.joins.to_sql());
        sql.push_str(&self.filters.to_sql());
        sql.push_str(&self.group_by.to_sql());
        if let Some(having) = &self.having_clause {
            sql.push_str("HAVING ");
            sql.push_str(having);
            sql.push('\n');
        }
        sql.push_str(&self.order_by.to_sql());
        sql.trim_end().to_string()
    }
}

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        let mut sql: String = String::new();

        if self.distinct {
            sql.push_str("SELECT DISTINCT\n");
        } else {
            sql.push_str("SELECT\n");
        }

        if self.items.is_empty() {
            sql.push_str("      1\n");
            return sql;
        }

        for (i, item) in self.items.iter().enumerate() {
            sql.push_str("      ");
            sql.push_str(&item.expression);
            if let Some(alias) = &item.col_alias {
                sql.push_str(" AS \"");
                sql.push_str(alias);
                sql.push('"');
            }
            if i + 1 < self.items.len() {
                sql.push(',');
            }
            sql.push('\n');
        }
        sql
    }
}

impl ToSql for FromTableItem {
    fn to_sql(&self) -> String {
        format!("FROM {} AS {}\n", self.table_name, self.table_alias)
    }
}

impl ToSql for JoinItems {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        for join in &self.0 {
            sql.push_str(&join.to_sql());
        }
        sql
    }
}

impl ToSql for Join {
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {} AS {}", self.join_type, self.table_name, self.table_alias);
        match and_combine(&self.joining_on) {
            Some(on) => {
                sql.push_str(" ON ");
                sql.push_str(&on);
            }
            // a join without any condition matches every row
            None => sql.push_str(" ON 1 = 1"),
        }
        sql.push('\n');
        sql
    }
}

impl ToSql for FilterItems {
    fn to_sql(&self) -> String {
        match and_combine(&self.0) {
            Some(expr) => format!("WHERE {}\n", expr),
            None => "".into(),
        }
    }
}

impl ToSql for GroupByExpressions {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        format!("GROUP BY {}\n", self.0.join(", "))
    }
}

impl ToSql for OrderByItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        format!("ORDER BY {}\n", self.0.join(", "))
    }
}
