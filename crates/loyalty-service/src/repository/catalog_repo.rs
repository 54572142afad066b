//! 分类与积分规则仓储
//!
//! 分类、规则的维护由管理后台负责，这里只提供交易流程需要的读取。

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::PointRule;

/// 分类仓储
pub struct CategoryRepository;

impl CategoryRepository {
    /// 在事务中检查分类是否存在
    pub async fn exists_in_tx(conn: &mut PgConnection, id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(conn)
                .await?;

        Ok(exists)
    }
}

/// 积分规则仓储
pub struct PointRuleRepository;

impl PointRuleRepository {
    /// 在事务中获取匹配 (category_id, action) 的全部启用规则
    pub async fn list_active_in_tx(
        conn: &mut PgConnection,
        category_id: i64,
        action: &str,
    ) -> Result<Vec<PointRule>> {
        let rules = sqlx::query_as::<_, PointRule>(
            r#"
            SELECT id, category_id, action, rule_type, value, min_amount, max_points,
                   active, created_at, updated_at
            FROM point_rules
            WHERE category_id = $1 AND action = $2 AND active = true
            ORDER BY id ASC
            "#,
        )
        .bind(category_id)
        .bind(action)
        .fetch_all(conn)
        .await?;

        Ok(rules)
    }
}
