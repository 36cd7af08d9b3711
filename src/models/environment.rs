/// 部署环境枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Environment {
    /// 预发布环境
    Staging,
    /// 生产环境
    Production,
}

impl Environment {
    /// 所有环境（diff 模式打开时全部预取）
    pub const ALL: [Environment; 2] = [Environment::Staging, Environment::Production];

    /// 获取服务端使用的环境名（databaseEnvironment 查询参数）
    pub fn name(self) -> &'static str {
        match self {
            Environment::Staging => "Staging",
            Environment::Production => "Production",
        }
    }

    /// 从字符串解析环境（不区分大小写）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "staging" => Some(Environment::Staging),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(Environment::from_str("Staging"), Some(Environment::Staging));
        assert_eq!(Environment::from_str(" production "), Some(Environment::Production));
        assert_eq!(Environment::from_str("prod"), Some(Environment::Production));
        assert_eq!(Environment::from_str("dev"), None);
    }

    #[test]
    fn test_serialized_name_matches_query_value() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"Production\"");
        assert_eq!(Environment::Production.to_string(), "Production");
    }
}
