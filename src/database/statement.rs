//! 参数化语句工具
//!
//! 字段列表取自实体列的声明顺序，占位符统一使用 PostgreSQL 的 `$n` 形式。

use sea_orm::{
    ConnectionTrait, DbBackend, DbErr, EntityTrait, FromQueryResult, IdenStatic,
    Iterable, ModelTrait, Statement, Value,
};

/// 构造 PostgreSQL 参数化语句
pub fn stmt<S, I>(sql: S, values: I) -> Statement
where
    S: Into<String>,
    I: IntoIterator<Item = Value>,
{
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// 执行语句并返回受影响行数
pub async fn exec<C, S, I>(db: &C, sql: S, values: I) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
    S: Into<String>,
    I: IntoIterator<Item = Value>,
{
    let result = db.execute_raw(stmt(sql, values)).await?;
    Ok(result.rows_affected())
}

/// 查询全部行并映射为 `M`
pub async fn select_all<M, C, S, I>(db: &C, sql: S, values: I) -> Result<Vec<M>, DbErr>
where
    M: FromQueryResult,
    C: ConnectionTrait,
    S: Into<String>,
    I: IntoIterator<Item = Value>,
{
    M::find_by_statement(stmt(sql, values)).all(db).await
}

/// 查询首行
pub async fn select_one<M, C, S, I>(db: &C, sql: S, values: I) -> Result<Option<M>, DbErr>
where
    M: FromQueryResult,
    C: ConnectionTrait,
    S: Into<String>,
    I: IntoIterator<Item = Value>,
{
    M::find_by_statement(stmt(sql, values)).one(db).await
}

/// 实体对应的表名
pub fn table_name<E: EntityTrait>() -> &'static str {
    E::default().table_name()
}

/// 实体列名（声明顺序）
pub fn field_names<E: EntityTrait>() -> Vec<&'static str> {
    E::Column::iter().map(|column| column.as_str()).collect()
}

/// 逗号分隔的列清单，可选表别名前缀，例如 `sp.study_plan_id, sp.name`
pub fn select_list<E: EntityTrait>(alias: Option<&str>) -> String {
    field_names::<E>()
        .into_iter()
        .map(|name| match alias {
            Some(alias) => format!("{alias}.{name}"),
            None => name.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// 模型各列的值，顺序与 [`field_names`] 一致
pub fn field_values<M: ModelTrait>(model: &M) -> Vec<Value> {
    <<M::Entity as EntityTrait>::Column as Iterable>::iter()
        .map(|column| model.get(column))
        .collect()
}

/// 生成 `$1, $2, ..., $n`
pub fn generate_placeholders(n: usize) -> String {
    placeholders_from(1, n)
}

/// 从 `$start` 开始生成 n 个占位符
pub fn placeholders_from(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 生成 `($1, $2), ($3, $4)` 形式的复合键占位符，用于 `(a, b) IN (...)`
pub fn composite_keys_placeholders(rows: usize, width: usize) -> String {
    (0..rows)
        .map(|row| format!("({})", placeholders_from(row * width + 1, width)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 动态语句构造器
///
/// 每次 [`bind`](QueryBuilder::bind) 追加一个参数并返回其占位符，
/// 可选条件按需拼接时占位符编号保持连续。
#[derive(Debug, Default)]
pub struct QueryBuilder {
    sql: String,
    values: Vec<Value>,
}

impl QueryBuilder {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    /// 绑定参数，返回 `$n`
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.values)
    }

    pub fn build(self) -> Statement {
        stmt(self.sql, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{course_study_plans, study_plans};

    #[test]
    fn test_generate_placeholders() {
        assert_eq!(generate_placeholders(3), "$1, $2, $3");
        assert_eq!(generate_placeholders(0), "");
        assert_eq!(placeholders_from(4, 2), "$4, $5");
    }

    #[test]
    fn test_composite_keys_placeholders() {
        assert_eq!(composite_keys_placeholders(2, 2), "($1, $2), ($3, $4)");
        assert_eq!(composite_keys_placeholders(1, 3), "($1, $2, $3)");
        assert_eq!(composite_keys_placeholders(0, 2), "");
    }

    #[test]
    fn test_field_names_follow_declaration_order() {
        assert_eq!(
            field_names::<course_study_plans::Entity>(),
            vec![
                "course_id",
                "study_plan_id",
                "created_at",
                "updated_at",
                "deleted_at"
            ]
        );
        assert_eq!(table_name::<study_plans::Entity>(), "study_plans");
    }

    #[test]
    fn test_select_list_with_alias() {
        let list = select_list::<course_study_plans::Entity>(Some("csp"));
        assert!(list.starts_with("csp.course_id, csp.study_plan_id"));
        assert!(list.ends_with("csp.deleted_at"));
    }

    #[test]
    fn test_query_builder_numbers_placeholders_sequentially() {
        let mut builder = QueryBuilder::new("SELECT 1 WHERE 1 = 1");
        let first = builder.bind("a");
        let second = builder.bind(3i32);
        builder.push(&format!(" AND a = {first} AND b = {second}"));

        assert_eq!(builder.sql(), "SELECT 1 WHERE 1 = 1 AND a = $1 AND b = $2");
        assert_eq!(builder.values().len(), 2);
    }
}
