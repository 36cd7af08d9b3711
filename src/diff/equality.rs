//! 字段值的结构化相等比较

use serde_json::Value;

/// 比较两个字段值是否相等
///
/// - 标量：直接比较
/// - 数组 / 对象：比较规范化序列化结果的字节
///
/// `serde_json::Map` 按键排序，因此对象比较与键的插入顺序无关；
/// 数组对顺序敏感。`Null` 只等于 `Null`。
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            match (serde_json::to_vec(a), serde_json::to_vec(b)) {
                (Ok(left), Ok(right)) => left == right,
                _ => a == b,
            }
        }
        _ => a == b,
    }
}
