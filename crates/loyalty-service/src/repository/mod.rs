//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 事务控制由调用方（服务层）决定，事务内操作以 `*_in_tx` 命名
//! - 需要读改写的行（余额、库存、兑换记录、风险分）先用 FOR UPDATE 加锁
//! - 写入的时间戳由服务层的时钟提供

mod balance_repo;
mod catalog_repo;
mod member_repo;
mod reward_repo;
mod risk_score_repo;
mod transaction_repo;

pub use balance_repo::BalanceRepository;
pub use catalog_repo::{CategoryRepository, PointRuleRepository};
pub use member_repo::MemberRepository;
pub use reward_repo::{RedemptionRepository, RewardRepository};
pub use risk_score_repo::RiskScoreRepository;
pub use transaction_repo::TransactionRepository;
