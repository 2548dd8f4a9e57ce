use crate::storage::{StorageArea, UploadedFile};
use crate::utils::AppError;
use actix_multipart::Multipart;
use futures::TryStreamExt;

/// Multipart form for `POST /api/cases/{id}/documents`.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct DocumentUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub document: Vec<u8>,
}

/// Multipart form for `POST /api/constitutions/upload`.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ConstitutionUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Reads the file part named `field_name`, enforcing the area's MIME filter
/// and size limit while streaming. Other parts are skipped.
pub async fn read_file_field(
    mut payload: Multipart,
    field_name: &str,
    area: StorageArea,
) -> Result<Option<UploadedFile>, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::validation("Please upload a file"))?;
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        area.check_mime_type(&content_type)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > area.max_bytes() {
                return Err(AppError::validation("File too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile {
            filename,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    const BOUNDARY: &str = "----legalease-boundary";

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: {t}\r\n\r\n",
            b = BOUNDARY,
            f = field,
            n = filename,
            t = content_type
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn receive(payload: Multipart) -> HttpResponse {
        match read_file_field(payload, "document", StorageArea::Documents).await {
            Ok(Some(file)) => HttpResponse::Ok().json(serde_json::json!({
                "filename": file.filename,
                "contentType": file.content_type,
                "size": file.bytes.len(),
            })),
            Ok(None) => HttpResponse::NoContent().finish(),
            Err(e) => crate::api::error_response("POST /upload", e),
        }
    }

    async fn post(body: Vec<u8>) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(App::new().route("/upload", web::post().to(receive))).await;
        let req = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn reads_named_file_part() {
        let res = post(multipart_body("document", "brief.pdf", "application/pdf", b"%PDF-1.4")).await;
        assert_eq!(res.status().as_u16(), 200);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["filename"], "brief.pdf");
        assert_eq!(body["contentType"], "application/pdf");
        assert_eq!(body["size"], 8);
    }

    #[actix_web::test]
    async fn other_field_names_are_ignored() {
        let res = post(multipart_body("attachment", "brief.pdf", "application/pdf", b"%PDF")).await;
        assert_eq!(res.status().as_u16(), 204);
    }

    #[actix_web::test]
    async fn disallowed_type_is_rejected() {
        let res = post(multipart_body("document", "tool.exe", "application/x-msdownload", b"MZ")).await;
        assert_eq!(res.status().as_u16(), 400);
    }
}
