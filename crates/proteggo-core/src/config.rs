//! Configuration module
//!
//! Settings are read once from the process environment (and an optional `.env` file)
//! and handed to every component at startup.

use std::env;
use std::str::FromStr;

const SERVER_PORT: u16 = 8080;
const DB_MAX_CONNECTIONS: u32 = 10;
const MAX_UPLOAD_SIZE_BYTES: usize = 5 * 1024 * 1024;
const FACE_DETECTION_MAX_RESULTS: u32 = 10;
const FINAL_IMAGE_QUALITY: f32 = 95.0;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_MAX_RETRIES: u32 = 5;
const TASK_TIMEOUT_SECS: u64 = 300;

const DEFAULT_STORAGE_HOST: &str = "firebasestorage.googleapis.com";
const DEFAULT_STORAGE_BUCKET: &str = "proteggo.appspot.com";
const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Where documents (images, faces, posts, messaging token) are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentStoreBackend {
    Postgres,
    Memory,
}

impl FromStr for DocumentStoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "DOCUMENT_STORE must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

/// How upload tasks reach the processing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskQueueBackend {
    /// Google Cloud Tasks posts each task back to the service over HTTP.
    CloudTasks,
    /// Tasks run on a bounded worker pool inside this process.
    InProcess,
}

impl FromStr for TaskQueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloud-tasks" | "cloud_tasks" | "cloudtasks" => Ok(Self::CloudTasks),
            "in-process" | "in_process" | "local" => Ok(Self::InProcess),
            other => Err(anyhow::anyhow!(
                "TASK_QUEUE_BACKEND must be 'cloud-tasks' or 'in-process', got '{}'",
                other
            )),
        }
    }
}

/// Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Object storage
    pub local_storage_path: String,
    pub storage_host: String,
    pub storage_bucket: String,
    // Document store
    pub document_store: DocumentStoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Upload and processing
    pub max_upload_size_bytes: usize,
    pub face_detection_max_results: u32,
    pub google_vision_api_key: Option<String>,
    pub google_vision_endpoint: String,
    pub final_image_quality: f32,
    // Task queue
    pub task_queue_backend: TaskQueueBackend,
    pub task_queue_path: Option<String>,
    pub task_queue_access_token: Option<String>,
    pub service_url: String,
    pub task_signing_secret: Option<String>,
    pub task_queue_max_workers: usize,
    pub task_queue_max_retries: u32,
    pub task_timeout_secs: u64,
    // Push notifications
    pub push_project_id: Option<String>,
    pub push_access_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            local_storage_path: "./data/storage".to_string(),
            storage_host: DEFAULT_STORAGE_HOST.to_string(),
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            document_store: DocumentStoreBackend::Memory,
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            face_detection_max_results: FACE_DETECTION_MAX_RESULTS,
            google_vision_api_key: None,
            google_vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            final_image_quality: FINAL_IMAGE_QUALITY,
            task_queue_backend: TaskQueueBackend::InProcess,
            task_queue_path: None,
            task_queue_access_token: None,
            service_url: format!("http://localhost:{}", SERVER_PORT),
            task_signing_secret: None,
            task_queue_max_workers: TASK_QUEUE_MAX_WORKERS,
            task_queue_max_retries: TASK_QUEUE_MAX_RETRIES,
            task_timeout_secs: TASK_TIMEOUT_SECS,
            push_project_id: None,
            push_access_token: None,
        }
    }
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
        if storage_backend.trim().to_lowercase() != "local" {
            return Err(anyhow::anyhow!(
                "Unsupported STORAGE_BACKEND '{}': only 'local' is available",
                storage_backend
            ));
        }

        let document_store = env::var("DOCUMENT_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let task_queue_backend = env::var("TASK_QUEUE_BACKEND")
            .unwrap_or_else(|_| "in-process".to_string())
            .parse()?;

        Ok(Self {
            server_port,
            environment,
            cors_origins,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            storage_host: env::var("STORAGE_HOST")
                .unwrap_or_else(|_| DEFAULT_STORAGE_HOST.to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
            document_store,
            database_url: optional_env("DATABASE_URL"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_BYTES")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_UPLOAD_SIZE_BYTES),
            face_detection_max_results: env::var("FACE_DETECTION_MAX_RESULTS")
                .unwrap_or_else(|_| FACE_DETECTION_MAX_RESULTS.to_string())
                .parse()
                .unwrap_or(FACE_DETECTION_MAX_RESULTS),
            google_vision_api_key: optional_env("GOOGLE_VISION_API_KEY"),
            google_vision_endpoint: env::var("GOOGLE_VISION_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_VISION_ENDPOINT.to_string()),
            final_image_quality: env::var("FINAL_IMAGE_QUALITY")
                .unwrap_or_else(|_| FINAL_IMAGE_QUALITY.to_string())
                .parse()
                .unwrap_or(FINAL_IMAGE_QUALITY),
            task_queue_backend,
            task_queue_path: optional_env("TASK_QUEUE_PATH"),
            task_queue_access_token: optional_env("TASK_QUEUE_ACCESS_TOKEN"),
            service_url: optional_env("SERVICE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", server_port)),
            task_signing_secret: optional_env("TASK_SIGNING_SECRET"),
            task_queue_max_workers: env::var("TASK_QUEUE_MAX_WORKERS")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_WORKERS),
            task_queue_max_retries: env::var("TASK_QUEUE_MAX_RETRIES")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_RETRIES),
            task_timeout_secs: env::var("TASK_TIMEOUT_SECS")
                .unwrap_or_else(|_| TASK_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TASK_TIMEOUT_SECS),
            push_project_id: optional_env("PUSH_PROJECT_ID"),
            push_access_token: optional_env("PUSH_ACCESS_TOKEN"),
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.document_store == DocumentStoreBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when DOCUMENT_STORE=postgres"
                    ))
                }
            }
        }

        if self.task_queue_backend == TaskQueueBackend::CloudTasks {
            if self.task_queue_path.is_none() {
                return Err(anyhow::anyhow!(
                    "TASK_QUEUE_PATH must be set when TASK_QUEUE_BACKEND=cloud-tasks"
                ));
            }
            if self.task_queue_access_token.is_none() {
                return Err(anyhow::anyhow!(
                    "TASK_QUEUE_ACCESS_TOKEN must be set when TASK_QUEUE_BACKEND=cloud-tasks"
                ));
            }
        }

        if self.is_production() {
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            if self.task_signing_secret.is_none() {
                return Err(anyhow::anyhow!(
                    "TASK_SIGNING_SECRET must be set in production"
                ));
            }
        }

        if let Some(secret) = &self.task_signing_secret {
            if secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "TASK_SIGNING_SECRET must be at least 32 characters long"
                ));
            }
        }

        if !(0.0..=100.0).contains(&self.final_image_quality) {
            return Err(anyhow::anyhow!(
                "FINAL_IMAGE_QUALITY must be between 0 and 100"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_BYTES must be greater than 0"));
        }

        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl From<ServiceConfig> for Config {
    fn from(config: ServiceConfig) -> Self {
        Config(Box::new(config))
    }
}

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(ServiceConfig::from_env()?.into())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.inner().is_production()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn storage_host(&self) -> &str {
        &self.inner().storage_host
    }

    pub fn storage_bucket(&self) -> &str {
        &self.inner().storage_bucket
    }

    pub fn document_store(&self) -> DocumentStoreBackend {
        self.inner().document_store
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn face_detection_max_results(&self) -> u32 {
        self.inner().face_detection_max_results
    }

    pub fn google_vision_api_key(&self) -> Option<&str> {
        self.inner().google_vision_api_key.as_deref()
    }

    pub fn google_vision_endpoint(&self) -> &str {
        &self.inner().google_vision_endpoint
    }

    pub fn final_image_quality(&self) -> f32 {
        self.inner().final_image_quality
    }

    pub fn task_queue_backend(&self) -> TaskQueueBackend {
        self.inner().task_queue_backend
    }

    pub fn task_queue_path(&self) -> Option<&str> {
        self.inner().task_queue_path.as_deref()
    }

    pub fn task_queue_access_token(&self) -> Option<&str> {
        self.inner().task_queue_access_token.as_deref()
    }

    pub fn service_url(&self) -> &str {
        &self.inner().service_url
    }

    pub fn task_signing_secret(&self) -> Option<&str> {
        self.inner().task_signing_secret.as_deref()
    }

    pub fn task_queue_max_workers(&self) -> usize {
        self.inner().task_queue_max_workers
    }

    pub fn task_queue_max_retries(&self) -> u32 {
        self.inner().task_queue_max_retries
    }

    pub fn task_timeout_secs(&self) -> u64 {
        self.inner().task_timeout_secs
    }

    pub fn push_project_id(&self) -> Option<&str> {
        self.inner().push_project_id.as_deref()
    }

    pub fn push_access_token(&self) -> Option<&str> {
        self.inner().push_access_token.as_deref()
    }
}
