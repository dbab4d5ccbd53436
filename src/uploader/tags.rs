// 标签推断
//
// 根据声明的 MIME 类型和文件扩展名生成标签：[类别, 扩展名]

use std::path::Path;

use crate::collector::Blob;

/// 无法匹配时的默认类别
pub const DEFAULT_KIND: &str = "other";

/// 文件类别推断
pub trait KindInference: Send + Sync {
    /// 返回粗粒度类别，无匹配时返回默认类别
    fn infer_kind(&self, mime_type: &str, filename: &str) -> String;
}

/// 基于 MIME 类型的默认推断
///
/// MIME 类型缺失或为通用二进制时按扩展名猜测
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeKindInference;

impl MimeKindInference {
    fn kind_of_mime(mime_type: &str) -> Option<&'static str> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        let (top, sub) = mime_type.split_once('/')?;

        match top {
            "image" => return Some("image"),
            "video" => return Some("video"),
            "audio" => return Some("audio"),
            "text" => return Some("document"),
            _ => {}
        }

        let sub = sub.split(';').next().unwrap_or(sub).trim();
        match sub {
            "pdf" | "msword" | "rtf" | "json" | "xml" | "epub+zip" => Some("document"),
            s if s.starts_with("vnd.openxmlformats-officedocument")
                || s.starts_with("vnd.ms-")
                || s.starts_with("vnd.oasis.opendocument") =>
            {
                Some("document")
            }
            "zip" | "gzip" | "x-tar" | "x-gtar" | "x-bzip" | "x-bzip2" | "x-xz"
            | "x-7z-compressed" | "x-rar-compressed" | "vnd.rar" | "zstd" => Some("archive"),
            _ => None,
        }
    }
}

impl KindInference for MimeKindInference {
    fn infer_kind(&self, mime_type: &str, filename: &str) -> String {
        let declared = mime_type.trim();
        let kind = if declared.is_empty() || declared == "application/octet-stream" {
            mime_guess::from_path(filename)
                .first_raw()
                .and_then(Self::kind_of_mime)
        } else {
            Self::kind_of_mime(declared)
        };
        kind.unwrap_or(DEFAULT_KIND).to_string()
    }
}

/// 小写扩展名，无扩展名时为 None
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// 生成有序标签列表
pub fn derive_tags(kinds: &dyn KindInference, blob: &Blob) -> Vec<String> {
    let mut tags = vec![kinds.infer_kind(&blob.content_type, &blob.name)];
    if let Some(ext) = file_extension(&blob.name) {
        if !tags.contains(&ext) {
            tags.push(ext);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_for(name: &str, mime: &str) -> Vec<String> {
        derive_tags(&MimeKindInference, &Blob::from_bytes(name, mime, Vec::new()))
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.TXT").as_deref(), Some("txt"));
        assert_eq!(file_extension("dir.v2/archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_infer_kind_by_mime() {
        let kinds = MimeKindInference;
        assert_eq!(kinds.infer_kind("image/jpeg", "x"), "image");
        assert_eq!(kinds.infer_kind("video/mp4", "x"), "video");
        assert_eq!(kinds.infer_kind("audio/mpeg", "x"), "audio");
        assert_eq!(kinds.infer_kind("text/plain; charset=utf-8", "x"), "document");
        assert_eq!(kinds.infer_kind("application/pdf", "x"), "document");
        assert_eq!(
            kinds.infer_kind(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "x"
            ),
            "document"
        );
        assert_eq!(kinds.infer_kind("application/zip", "x"), "archive");
        assert_eq!(kinds.infer_kind("application/x-executable", "x"), DEFAULT_KIND);
    }

    #[test]
    fn test_infer_kind_falls_back_to_filename() {
        let kinds = MimeKindInference;
        assert_eq!(kinds.infer_kind("", "song.mp3"), "audio");
        assert_eq!(kinds.infer_kind("application/octet-stream", "pic.png"), "image");
        assert_eq!(kinds.infer_kind("", "unknown"), DEFAULT_KIND);
    }

    #[test]
    fn test_derive_tags() {
        assert_eq!(tags_for("Photo.JPG", "image/jpeg"), vec!["image", "jpg"]);
        assert_eq!(tags_for("notes", "text/plain"), vec!["document"]);
        assert_eq!(tags_for("blob", ""), vec![DEFAULT_KIND]);
    }
}
