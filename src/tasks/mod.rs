mod scheduler;

pub use scheduler::{
    ProcessOptions, ProcessReport, ScheduleResult, ScheduledNotificationDriver, SchedulerError,
    SchedulerTask, DEFAULT_MAX_CONCURRENCY,
};
