//! 会员仓储

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::Member;

const MEMBER_COLUMNS: &str = r#"
    id, member_code, name, email, phone, branch_id, status, created_at, updated_at
"#;

/// 会员仓储
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 获取会员
    pub async fn get(&self, id: i64) -> Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// 按会员编码获取会员
    pub async fn get_by_code(&self, member_code: &str) -> Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE member_code = $1"
        ))
        .bind(member_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// 在事务中获取会员
    pub async fn get_in_tx(conn: &mut PgConnection, id: i64) -> Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(member)
    }

    /// 在事务中锁定会员行（FOR NO KEY UPDATE）
    ///
    /// 同一会员的积分交易因此串行执行。不使用 FOR UPDATE：
    /// 其他事务写入引用 members 的外键行时需要 KEY SHARE 锁，FOR UPDATE 会与之冲突。
    pub async fn lock_in_tx(conn: &mut PgConnection, id: i64) -> Result<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1 FOR NO KEY UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(member)
    }
}
