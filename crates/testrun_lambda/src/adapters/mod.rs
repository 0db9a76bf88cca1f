pub mod codebuild;
pub mod dynamo;
pub mod job_trigger;
pub mod notifier;
pub mod object_reader;
pub mod s3;
pub mod sns;
pub mod store;
