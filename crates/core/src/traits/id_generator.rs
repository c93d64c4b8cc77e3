use uuid::Uuid;

/// Worker身份生成器
///
/// 同一任务内并发存活的Worker之间ID必须唯一。
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// 默认实现，每次生成新的 UUID v4
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
