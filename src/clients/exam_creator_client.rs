/// exam-creator API 客户端
///
/// 封装所有与 exam-creator 服务相关的 HTTP 调用
use crate::clients::exam_store::{ExamGenerator, ExamStore};
use crate::config::Config;
use crate::error::{AppError, AppResult, ApiError, ConfigError};
use crate::models::{Environment, ExamTemplate, GeneratedExam, TemplateId};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// exam-creator 客户端
#[derive(Clone)]
pub struct ExamCreatorClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

/// 列表接口的单项
#[derive(Deserialize)]
struct ExamListItem {
    exam: ExamTemplate,
}

impl ExamCreatorClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session_id: config.session_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(sid) = &self.session_id {
            builder = builder.header(COOKIE, format!("sid={}", sid));
        }
        builder
    }

    /// 发送请求并把非 2xx 响应转换为 `ApiError::BadResponse`
    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> AppResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(AppError::api_bad_response(endpoint, status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, endpoint: &str) -> AppResult<T> {
        response.json::<T>().await.map_err(|source| {
            AppError::Api(ApiError::JsonParseFailed {
                endpoint: endpoint.to_string(),
                source,
            })
        })
    }
}

#[async_trait]
impl ExamGenerator for ExamCreatorClient {
    #[instrument(skip(self), err(Debug))]
    async fn generate_exam(&self, template_id: &TemplateId) -> AppResult<GeneratedExam> {
        let endpoint = format!("/api/exams/{}/generate", template_id);
        let response = self.send(self.request(Method::POST, &endpoint), &endpoint).await?;
        let generated: GeneratedExam = Self::decode(response, &endpoint).await?;

        debug!("生成考试实例: {}", generated.id);

        Ok(generated)
    }
}

#[async_trait]
impl ExamStore for ExamCreatorClient {
    #[instrument(skip(self), err(Debug))]
    async fn list_exams(&self) -> AppResult<Vec<ExamTemplate>> {
        let endpoint = "/api/exams";
        let response = self.send(self.request(Method::GET, endpoint), endpoint).await?;
        let items: Vec<ExamListItem> = Self::decode(response, endpoint).await?;

        Ok(items.into_iter().map(|item| item.exam).collect())
    }

    #[instrument(skip(self), err(Debug))]
    async fn get_deployed_exam(
        &self,
        template_id: &TemplateId,
        environment: Environment,
    ) -> AppResult<Option<ExamTemplate>> {
        let endpoint = format!("/api/exam-environment/exams/{}", template_id);
        let builder = self
            .request(Method::GET, &endpoint)
            .query(&[("databaseEnvironment", environment.name())]);

        match self.send(builder, &endpoint).await {
            Ok(response) => Self::decode(response, &endpoint).await,
            // 404 表示该环境中不存在此模板，不是错误
            Err(AppError::Api(ApiError::BadResponse { status, .. }))
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                debug!("模板 {} 未部署到 {}", template_id, environment);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let config = Config {
            api_base_url: "http://localhost:8080/".to_string(),
            ..Config::default()
        };
        let client = ExamCreatorClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_list_item_shape() {
        let items: Vec<ExamListItem> = serde_json::from_str(
            r#"[{ "exam": { "id": "t1", "config": { "name": "A", "totalTimeInS": 60,
                 "retakeTimeInS": 60, "passingPercent": 70.0 } } }]"#,
        )
        .unwrap();
        assert_eq!(items[0].exam.config.name, "A");
    }
}
