mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, DispatchConfig, OtelConfig, RedisConfig, SchedulerConfig,
    ServerConfig, Settings, StorageConfig,
};
