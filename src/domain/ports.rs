use crate::domain::model::{CadSystem, Record, ToolId, TransformResult, UserMapping};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// 本地路徑或 http(s) URL
    fn input(&self) -> &str;
    fn output_path(&self) -> &str;
    fn tool(&self) -> ToolId;
    /// 指定時略過自動判斷
    fn cad_system(&self) -> Option<CadSystem>;
    fn field_mapping(&self) -> &UserMapping;
    fn output_formats(&self) -> &[String];
    fn output_filename(&self) -> &str {
        "formatted_output.zip"
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
