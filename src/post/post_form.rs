use actix_multipart::Multipart;
use futures_util::StreamExt;

use crate::post::post_model::ImageSource;
use crate::utils::error::CustomError;
use crate::utils::uploads::FileUpload;

/// Text fields larger than this are rejected outright
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Fields of a create/update post form
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    /// `image` sent as a file part
    pub image_file: Option<FileUpload>,
    /// `image` sent as a plain text locator
    pub image_locator: Option<String>,
}

impl PostForm {
    /// A fresh upload wins over a locator
    pub fn image_source(self) -> Option<ImageSource> {
        match (self.image_file, self.image_locator) {
            (Some(file), _) => Some(ImageSource::Uploaded(file)),
            (None, Some(locator)) => Some(ImageSource::Existing(locator)),
            (None, None) => None,
        }
    }
}

/// Read a multipart post form: `title`, `content` and `image`.
///
/// An image part is buffered up to one byte past `max_image_bytes`; the rest
/// is drained unread so the size check downstream rejects it.
pub async fn extract_post_form(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<PostForm, CustomError> {
    let mut form = PostForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            CustomError::BadRequestError(format!("Error reading multipart field: {}", e))
        })?;

        let Some(content_disposition) = field.content_disposition() else {
            continue;
        };
        let field_name = content_disposition.get_name().unwrap_or("").to_string();
        let file_name = content_disposition.get_filename().map(|f| f.to_string());
        let content_type = field.content_type().map(|ct| ct.to_string());

        let limit = match file_name {
            Some(_) => max_image_bytes,
            None => MAX_TEXT_FIELD_BYTES,
        };
        let mut data = Vec::new();
        let mut capped = false;
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                CustomError::BadRequestError(format!("Error reading multipart chunk: {}", e))
            })?;
            if capped {
                continue;
            }
            if data.len() + chunk.len() > limit {
                if file_name.is_none() {
                    return Err(CustomError::BadRequestError(format!(
                        "Field '{}' is too large",
                        field_name
                    )));
                }
                let keep = limit + 1 - data.len();
                data.extend_from_slice(&chunk[..keep]);
                capped = true;
                log::info!("File part '{}' exceeds {} bytes, discarding the rest", field_name, limit);
                continue;
            }
            data.extend_from_slice(&chunk);
        }

        match (field_name.as_str(), file_name) {
            ("image", Some(name)) => {
                if !data.is_empty() {
                    form.image_file = Some(FileUpload::new(name, data, content_type));
                }
            }
            (name, None) => {
                let text = String::from_utf8(data).map_err(|_| {
                    CustomError::BadRequestError(format!("Field '{}' is not valid UTF-8", name))
                })?;
                match name {
                    "title" => form.title = text,
                    "content" => form.content = text,
                    "image" if !text.trim().is_empty() => form.image_locator = Some(text),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::PayloadError;
    use actix_web::http::header::{self, HeaderMap, HeaderValue};
    use actix_web::web::Bytes;
    use futures_util::stream;

    use crate::utils::uploads::FileValidator;

    const BOUNDARY: &str = "----postformboundary";

    fn multipart(body: Vec<u8>, chunk_size: usize) -> Multipart {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", BOUNDARY)).unwrap(),
        );
        let chunks: Vec<Result<Bytes, PayloadError>> = body
            .chunks(chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Multipart::new(&headers, stream::iter(chunks))
    }

    fn body(image: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"big.png\"\r\nContent-Type: image/png\r\n\r\n",
                b = BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(
            format!(
                "\r\n--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nA title\r\n--{b}--\r\n",
                b = BOUNDARY
            )
            .as_bytes(),
        );
        body
    }

    #[actix_web::test]
    async fn oversized_image_is_capped_and_rejected() {
        let form = extract_post_form(multipart(body(&[7u8; 4096]), 100), 16)
            .await
            .unwrap();

        // fields after the oversized part are still read
        assert_eq!(form.title, "A title");
        let image = form.image_file.expect("image part kept");
        assert_eq!(image.size(), 17);

        let validator = FileValidator::images().with_max_size(16);
        assert!(validator.validate(&image).is_err());
    }

    #[actix_web::test]
    async fn image_within_limit_is_kept_whole() {
        let form = extract_post_form(multipart(body(&[7u8; 16]), 5), 16)
            .await
            .unwrap();
        assert_eq!(form.image_file.unwrap().data, vec![7u8; 16]);
    }

    #[test]
    fn upload_wins_over_locator() {
        let form = PostForm {
            image_file: Some(FileUpload::new("a.png".into(), vec![1], None)),
            image_locator: Some("images/old.png".into()),
            ..PostForm::default()
        };
        assert!(matches!(form.image_source(), Some(ImageSource::Uploaded(_))));

        let form = PostForm {
            image_locator: Some("images/old.png".into()),
            ..PostForm::default()
        };
        assert!(matches!(form.image_source(), Some(ImageSource::Existing(l)) if l == "images/old.png"));

        assert!(PostForm::default().image_source().is_none());
    }
}
