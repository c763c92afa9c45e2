//! Wire protocol for the persistence endpoint.
//!
//! The builder core is client-side: saving, asset upload, and preset fields
//! are HTTP endpoints owned by the back office. This module carries the JSON
//! request/response shapes, the [`PersistGateway`] boundary the host
//! implements over its HTTP client, and the one piece of application logic:
//! adopting server-assigned ids after a successful save. Every failure mode
//! leaves the in-memory template untouched so the user can retry without
//! data loss.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    composition::model::{Element, ObjectId, Slide, Template},
    foundation::error::{SlidereelError, SlidereelResult},
};

/// Body of the save call. The endpoint takes text fields and decorative
/// shapes as separate collections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveRequest {
    pub template_id: Option<i64>,
    pub slides: Vec<Slide>,
    pub shapes: Vec<Element>,
    pub fields: Vec<Element>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    /// Echoed slides carrying server-assigned ids, in request order.
    #[serde(default)]
    pub slides: Option<Vec<Slide>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresetFieldResponse {
    pub success: bool,
    #[serde(default)]
    pub field: Option<Element>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What an uploaded asset file is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadContext {
    Slide(ObjectId),
    Preset(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Video,
}

/// One multipart asset upload.
#[derive(Clone, Debug)]
pub struct AssetUpload<'a> {
    pub template_id: i64,
    pub context: UploadContext,
    pub kind: UploadKind,
    pub file_name: String,
    pub bytes: &'a [u8],
}

/// The external HTTP boundary. The back office implements this over its
/// HTTP client; tests implement it in memory.
pub trait PersistGateway {
    fn save(&mut self, request: &SaveRequest) -> SlidereelResult<SaveResponse>;
    fn upload_asset(&mut self, upload: &AssetUpload<'_>) -> SlidereelResult<UploadResponse>;
    fn add_preset_field(
        &mut self,
        template_id: i64,
        preset_id: i64,
    ) -> SlidereelResult<PresetFieldResponse>;
}

/// Split a template into the save payload the endpoint expects.
pub fn build_save_request(template: &Template) -> SaveRequest {
    let (fields, shapes): (Vec<Element>, Vec<Element>) = template
        .elements
        .iter()
        .cloned()
        .partition(|e| e.kind.is_text());

    SaveRequest {
        template_id: template.id,
        slides: template.slides.clone(),
        shapes,
        fields,
    }
}

/// Adopt server-assigned slide ids from a save response.
///
/// The response echoes the slide list positionally; pending slide ids flip
/// to their persisted ids and element `slide_id` references are remapped.
/// On `success = false` or a malformed payload the template is left
/// completely unchanged and the error is surfaced for the user to retry.
pub fn apply_save_response(
    template: &mut Template,
    response: &SaveResponse,
) -> SlidereelResult<()> {
    if !response.success {
        let reason = response
            .error
            .as_deref()
            .unwrap_or("save failed with no error message");
        return Err(SlidereelError::persistence(reason));
    }

    let Some(server_slides) = response.slides.as_ref() else {
        // Success with no slide echo: nothing to adopt.
        return Ok(());
    };

    if server_slides.len() != template.slides.len() {
        return Err(SlidereelError::persistence(format!(
            "server returned {} slides for {} sent",
            server_slides.len(),
            template.slides.len()
        )));
    }

    // Validate the whole mapping before mutating anything.
    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for (local, server) in template.slides.iter().zip(server_slides) {
        if server.id.is_pending() {
            return Err(SlidereelError::persistence(format!(
                "server echoed unassigned slide id {}",
                server.id
            )));
        }
        id_map.insert(local.id, server.id);
    }

    for (local, server) in template.slides.iter_mut().zip(server_slides) {
        local.id = server.id;
    }
    for element in &mut template.elements {
        if let Some(slide_id) = element.slide_id
            && let Some(new_id) = id_map.get(&slide_id)
        {
            element.slide_id = Some(*new_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::model::{ElementKind, ShapeStyle, TextStyle};

    fn template_with_elements() -> Template {
        let mut t = Template::new();
        let slide_id = t.slides[0].id;
        let text = t.add_element(ElementKind::Text {
            style: TextStyle::default(),
        });
        let shape = t.add_element(ElementKind::Rectangle {
            shape: ShapeStyle::default(),
            corner_radius_px: 4.0,
        });
        t.attach_element(text, slide_id, 50.0, 20.0).unwrap();
        t.attach_element(shape, slide_id, 50.0, 70.0).unwrap();
        t
    }

    #[test]
    fn save_request_splits_fields_and_shapes() {
        let t = template_with_elements();
        let req = build_save_request(&t);
        assert_eq!(req.slides.len(), 1);
        assert_eq!(req.fields.len(), 1);
        assert_eq!(req.shapes.len(), 1);
        assert!(req.fields[0].kind.is_text());
        assert!(!req.shapes[0].kind.is_text());
    }

    #[test]
    fn save_request_json_roundtrip() {
        let t = template_with_elements();
        let req = build_save_request(&t);
        let json = serde_json::to_string(&req).unwrap();
        let back: SaveRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.slides, req.slides);
        assert_eq!(back.fields, req.fields);
        assert_eq!(back.shapes, req.shapes);
    }

    #[test]
    fn successful_save_adopts_server_ids() {
        let mut t = template_with_elements();
        assert!(t.slides[0].id.is_pending());

        let mut echoed = t.slides.clone();
        echoed[0].id = ObjectId::Persisted(501);
        let response = SaveResponse {
            success: true,
            slides: Some(echoed),
            error: None,
        };

        apply_save_response(&mut t, &response).unwrap();
        assert_eq!(t.slides[0].id, ObjectId::Persisted(501));
        // Elements follow their slide.
        for e in &t.elements {
            assert_eq!(e.slide_id, Some(ObjectId::Persisted(501)));
        }
        t.validate().unwrap();
    }

    #[test]
    fn failed_save_leaves_template_untouched() {
        let mut t = template_with_elements();
        let before = t.clone();

        let response = SaveResponse {
            success: false,
            slides: None,
            error: Some("quota exceeded".to_string()),
        };
        let err = apply_save_response(&mut t, &response).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(t, before);
    }

    #[test]
    fn malformed_slide_count_is_rejected_without_mutation() {
        let mut t = template_with_elements();
        let before = t.clone();

        let response = SaveResponse {
            success: true,
            slides: Some(Vec::new()),
            error: None,
        };
        assert!(apply_save_response(&mut t, &response).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn pending_id_echo_is_rejected_without_mutation() {
        let mut t = template_with_elements();
        let before = t.clone();

        let response = SaveResponse {
            success: true,
            slides: Some(t.slides.clone()), // still pending
            error: None,
        };
        assert!(apply_save_response(&mut t, &response).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn response_json_tolerates_missing_optionals() {
        let resp: SaveResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(resp.success);
        assert!(resp.slides.is_none());

        let resp: UploadResponse =
            serde_json::from_str(r#"{"success": true, "url": "/uploads/bg.jpg"}"#).unwrap();
        assert_eq!(resp.url.as_deref(), Some("/uploads/bg.jpg"));

        let resp: PresetFieldResponse =
            serde_json::from_str(r#"{"success": false, "error": "no such preset"}"#).unwrap();
        assert_eq!(resp.error.as_deref(), Some("no such preset"));
    }
}
