use crate::error::ConfigError;

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

const DEFAULT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".ppt", ".pptx", ".txt", ".rtf", ".epub"];

/// Everything the pipeline needs, loaded once at process startup and passed
/// by reference into every stage. No component re-reads the environment
/// after this is constructed.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub drive_service_account_file: String,
    pub drive_folder_id: String,

    pub s3_endpoint: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket: String,
    pub s3_region: String,

    pub openai_api_key: String,
    pub vector_store_id: String,

    pub max_files_per_run: usize,
    pub additional_extensions: Vec<String>,

    pub processor_max_workers: usize,
    pub indexer_max_workers: usize,
    pub sync_max_workers: usize,

    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_db: String,
    pub postgres_user: String,
    pub postgres_password: String,

    pub ocr_timeout_secs: u64,
    pub max_stale_hours: i64,
    pub extraction_chunk_size: usize,

    pub pdftotext_binary: String,
    pub tesseract_binary: String,
    pub pandoc_binary: String,
    pub use_process_pool: bool,
}

impl PipelineConfig {
    /// Load configuration from environment variables, matching the variable
    /// names the original ingest service used.
    pub fn from_env() -> Result<Self, ConfigError> {
        let extensions_raw = env_or(
            "ADDITIONAL_EXTENSIONS",
            &DEFAULT_EXTENSIONS.join(","),
        );
        let additional_extensions = extensions_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            drive_service_account_file: required_env("GOOGLE_SERVICE_ACCOUNT_FILE")?,
            drive_folder_id: required_env("GOOGLE_DRIVE_FOLDER_ID")?,

            s3_endpoint: required_env("S3_ENDPOINT")?,
            s3_access_key: required_env("S3_ACCESS_KEY")?,
            s3_secret_key: required_env("S3_SECRET_KEY")?,
            s3_bucket: required_env("S3_BUCKET")?,
            s3_region: env_or("S3_REGION", "us-east-1"),

            openai_api_key: required_env("OPENAI_API_KEY")?,
            vector_store_id: required_env("VECTOR_STORE_ID")?,

            max_files_per_run: env_or_parse("MAX_FILES_PER_RUN", 10)?,
            additional_extensions,

            processor_max_workers: env_or_parse("PROCESSOR_MAX_WORKERS", 5)?,
            indexer_max_workers: env_or_parse("INDEXER_MAX_WORKERS", 3)?,
            sync_max_workers: env_or_parse("SYNC_MAX_WORKERS", 10)?,

            postgres_host: env_or("POSTGRES_HOST", "localhost"),
            postgres_port: env_or_parse("POSTGRES_PORT", 5432)?,
            postgres_db: env_or("POSTGRES_DB", "ai_knowledge_base"),
            postgres_user: env_or("POSTGRES_USER", "postgres"),
            postgres_password: env_or("POSTGRES_PASSWORD", "postgres"),

            ocr_timeout_secs: env_or_parse("OCR_TIMEOUT_SECS", 300)?,
            max_stale_hours: env_or_parse("MAX_STALE_HOURS", 24)?,
            extraction_chunk_size: env_or_parse("EXTRACTION_CHUNK_SIZE", 100)?,

            pdftotext_binary: env_or("PDFTOTEXT_BINARY", "pdftotext"),
            tesseract_binary: env_or("TESSERACT_BINARY", "tesseract"),
            pandoc_binary: env_or("PANDOC_BINARY", "pandoc"),
            use_process_pool: env_or_parse("USE_PROCESS_POOL", false)?,
        })
    }

    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres_user, self.postgres_password, self.postgres_host, self.postgres_port, self.postgres_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "GOOGLE_SERVICE_ACCOUNT_FILE", "GOOGLE_DRIVE_FOLDER_ID", "S3_ENDPOINT", "S3_ACCESS_KEY",
            "S3_SECRET_KEY", "S3_BUCKET", "S3_REGION", "OPENAI_API_KEY", "VECTOR_STORE_ID",
            "MAX_FILES_PER_RUN", "ADDITIONAL_EXTENSIONS", "PROCESSOR_MAX_WORKERS",
            "INDEXER_MAX_WORKERS", "POSTGRES_HOST", "POSTGRES_PORT",
        ] {
            std::env::remove_var(key);
        }
    }

    fn set_required() {
        std::env::set_var("GOOGLE_SERVICE_ACCOUNT_FILE", "/tmp/sa.json");
        std::env::set_var("GOOGLE_DRIVE_FOLDER_ID", "folder-123");
        std::env::set_var("S3_ENDPOINT", "https://s3.example.com");
        std::env::set_var("S3_ACCESS_KEY", "ak");
        std::env::set_var("S3_SECRET_KEY", "sk");
        std::env::set_var("S3_BUCKET", "bucket");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("VECTOR_STORE_ID", "vs-1");
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = PipelineConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(_)));
    }

    #[test]
    fn defaults_applied_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        let cfg = PipelineConfig::from_env().unwrap();
        assert_eq!(cfg.s3_region, "us-east-1");
        assert_eq!(cfg.max_files_per_run, 10);
        assert_eq!(cfg.processor_max_workers, 5);
        assert_eq!(cfg.indexer_max_workers, 3);
        assert_eq!(cfg.additional_extensions, vec![".pdf", ".doc", ".docx", ".ppt", ".pptx", ".txt", ".rtf", ".epub"]);
        clear_env();
    }

    #[test]
    fn extensions_are_split_and_trimmed() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("ADDITIONAL_EXTENSIONS", ".pdf, .txt ,.md");
        let cfg = PipelineConfig::from_env().unwrap();
        assert_eq!(cfg.additional_extensions, vec![".pdf", ".txt", ".md"]);
        clear_env();
    }
}
