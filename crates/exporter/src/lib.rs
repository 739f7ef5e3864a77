//! # Exporter
//!
//! 采集结果持久化。
//!
//! 负责：
//! - 会话/运行目录命名与创建
//! - 每帧输出写盘（PNG、PLY），相机位姿表与焦距文件
//! - `FrameSink` 实现：`FileSink`、`LogSink`
//! - 激光雷达累积点云（PCD）
//! - 数据集 zip 打包

pub mod archive;
pub mod error;
pub mod format;
pub mod image_io;
pub mod layout;
pub mod pointcloud_io;
pub mod run;
pub mod sinks;

pub use archive::{collect_entries, package_archive, run_folders, ArchiveSummary};
pub use contracts::{CapturedFrame, FrameSink, Modality};
pub use error::{ExportError, Result};
pub use format::{pose_line, sci};
pub use image_io::save_png;
pub use layout::{
    run_dir_name, session_dir, session_dir_name, CAMERA_FILE, FOCAL_FILE, RUN_METADATA_FILE,
};
pub use pointcloud_io::{write_pcd, write_ply};
pub use run::{RunMetadata, RunWriter};
pub use sinks::{FileSink, LogSink};
