//! 视频抽帧：按目标帧率采样并以 JPEG 落盘

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use log::{info, warn};
use thiserror::Error;

use crate::config::Config;
use crate::core::store::VideoStore;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("video file '{0}' does not exist")]
    MissingVideo(PathBuf),
    #[error("video path '{0}' has no usable file stem")]
    BadVideoPath(PathBuf),
    #[error("no video stream in '{0}'")]
    NoVideoStream(PathBuf),
    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),
    #[error("decoded frame buffer has unexpected size")]
    BadFrameBuffer,
    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 把视频按 `config.video_fps` 解码成 JPEG 帧序列，
/// 写入 `{root}/{video_stem}/frames/`，返回帧目录的绝对路径。
pub fn decode_video_to_frames(config: &Config, video_path: &Path) -> Result<PathBuf, FrameError> {
    if !video_path.is_file() {
        return Err(FrameError::MissingVideo(video_path.to_path_buf()));
    }
    let video_stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| FrameError::BadVideoPath(video_path.to_path_buf()))?;

    let store = VideoStore::new(&config.storage_root);
    let frames_dir = store.ensure_frames_dir(video_stem)?;

    ffmpeg::init()?;
    let mut input = ffmpeg::format::input(&video_path)?;

    let (stream_index, source_fps, parameters) = {
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| FrameError::NoVideoStream(video_path.to_path_buf()))?;
        let mut fps = f64::from(stream.avg_frame_rate());
        if !fps.is_finite() || fps <= 0.0 {
            fps = f64::from(stream.rate());
        }
        (stream.index(), fps, stream.parameters())
    };

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?
        .decoder()
        .video()?;
    let mut scaler = ffmpeg::software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )?;

    let stride = sampling_stride(source_fps, config.video_fps);
    info!(
        "🎬 decoding {} (source {:.2} fps, target {:.2} fps, stride {})",
        video_path.display(),
        source_fps,
        config.video_fps,
        stride
    );

    let mut decoded = ffmpeg::util::frame::video::Video::empty();
    let mut rgb = ffmpeg::util::frame::video::Video::empty();
    let mut frame_count: u64 = 0;
    let mut saved_count: u64 = 0;

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            warn!("skipping undecodable packet: {}", e);
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            if should_sample(frame_count, stride) {
                scaler.run(&decoded, &mut rgb)?;
                let frame_path = frames_dir.join(frame_file_name(saved_count));
                write_frame_jpeg(&rgb, &frame_path)?;
                saved_count += 1;
            }
            frame_count += 1;
        }
    }

    // 冲掉解码器里缓存的尾帧
    decoder.send_eof().ok();
    while decoder.receive_frame(&mut decoded).is_ok() {
        if should_sample(frame_count, stride) {
            scaler.run(&decoded, &mut rgb)?;
            let frame_path = frames_dir.join(frame_file_name(saved_count));
            write_frame_jpeg(&rgb, &frame_path)?;
            saved_count += 1;
        }
        frame_count += 1;
    }

    info!("decoded {} frames, saved {}", frame_count, saved_count);
    Ok(std::fs::canonicalize(frames_dir)?)
}

/// 采样间隔（源帧数）：目标帧率低于源帧率时为 round(source/target)，否则 1
pub fn sampling_stride(source_fps: f64, target_fps: f64) -> u64 {
    if !source_fps.is_finite() || source_fps <= 0.0 {
        return 1;
    }
    if !target_fps.is_finite() || target_fps <= 0.0 || target_fps >= source_fps {
        return 1;
    }
    ((source_fps / target_fps).round() as u64).max(1)
}

fn should_sample(frame_index: u64, stride: u64) -> bool {
    frame_index % stride == 0
}

/// 零填充到固定宽度，目录序就是帧序
pub fn frame_file_name(saved_index: u64) -> String {
    format!("frame_n{:06}.jpg", saved_index)
}

fn write_frame_jpeg(
    frame: &ffmpeg::util::frame::video::Video,
    path: &Path,
) -> Result<(), FrameError> {
    let width = frame.width();
    let height = frame.height();
    let data = frame.data(0);
    let line_size = frame.stride(0);
    let row_len = width as usize * 3;

    // ffmpeg 的行可能带对齐填充，逐行拷贝成紧凑 RGB
    let mut buffer = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * line_size;
        let end = start + row_len;
        if end > data.len() {
            return Err(FrameError::BadFrameBuffer);
        }
        buffer.extend_from_slice(&data[start..end]);
    }

    let img = image::RgbImage::from_raw(width, height, buffer)
        .ok_or(FrameError::BadFrameBuffer)?;
    img.save(path)?;
    Ok(())
}
