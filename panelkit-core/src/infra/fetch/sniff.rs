use panelkit_model::{MediaReference, OCTET_STREAM};

/// Pick a type tag for a payload whose response did not name a usable one.
///
/// Magic bytes win over the reference's extension, which wins over the
/// generic binary type.
pub fn sniff_mime(bytes: &[u8], reference: &MediaReference) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }

    reference
        .extension()
        .and_then(|ext| mime_for_extension(&ext))
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Normalise a `Content-Type` header value; `None` when it carries no
/// information beyond "some bytes".
pub fn declared_mime(content_type: Option<&str>) -> Option<String> {
    let essence = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    if essence.is_empty() || essence == OCTET_STREAM {
        return None;
    }
    Some(essence)
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => return None,
    })
}
