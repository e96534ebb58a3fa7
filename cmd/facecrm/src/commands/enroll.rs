//! Enrollment command.

use std::sync::Arc;

use clap::Args;
use facecrm_cli::{PrecomputedExtractor, PrecomputedLoader, load_input};
use facecrm_faceid::{ContactFields, Enroller, EnrollmentError, FaceDetection, LazyExtractor};
use serde::Serialize;

use super::{ContactView, get_config, load_image, open_store, output, print_error, print_success};
use crate::Cli;

/// Enroll a new contact from a photo.
///
/// The face model's output for the photo is read from --detections, a
/// JSON or YAML list of `{box, score, embedding}` objects. The highest
/// scoring face is enrolled.
#[derive(Args)]
pub struct EnrollCommand {
    /// Photo of the contact
    #[arg(long)]
    image: String,

    /// Recorded detections for the photo
    #[arg(long)]
    detections: String,

    /// Full name (required)
    #[arg(long, default_value = "")]
    name: String,

    /// Company (required)
    #[arg(long, default_value = "")]
    company: String,

    #[arg(long, default_value = "")]
    title: String,

    /// LinkedIn profile URL
    #[arg(long, default_value = "")]
    linkedin: String,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    phone: String,

    #[arg(long, default_value = "")]
    notes: String,

    /// Comma-separated tags
    #[arg(long, default_value = "")]
    tags: String,

    /// Only check that the photo has a usable face; save nothing
    #[arg(long)]
    check: bool,
}

#[derive(Serialize)]
struct CaptureView {
    face_captured: bool,
    score: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    dimension: usize,
}

impl EnrollCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let image = load_image(&self.image).await?;
        let faces: Vec<FaceDetection> = load_input(&self.detections)?;

        let recorded = Arc::new(PrecomputedExtractor::new(cfg.matching.dimension));
        recorded.register(&image, faces);
        let model = Arc::new(LazyExtractor::new(PrecomputedLoader::new(recorded)));
        model.ensure_loaded().await?;

        let repo = open_store(&cfg).await?;
        let enroller = Enroller::new(model, repo);

        if self.check {
            let face = enroller.capture(&image).await.map_err(report)?;
            return output(cli).write(&CaptureView {
                face_captured: true,
                score: face.score,
                x: face.bbox.x,
                y: face.bbox.y,
                width: face.bbox.width,
                height: face.bbox.height,
                dimension: face.embedding.dim(),
            });
        }

        let contact = enroller.enroll(&image, self.fields()).await.map_err(report)?;
        print_success(&format!("Enrolled {} ({})", contact.name, contact.id));
        output(cli).write(&ContactView::from(&contact))
    }

    fn fields(&self) -> ContactFields {
        ContactFields {
            name: self.name.clone(),
            company: self.company.clone(),
            title: self.title.clone(),
            linkedin_url: self.linkedin.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            notes: self.notes.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Prints what the user can fix before turning the error into a failure.
fn report(e: EnrollmentError) -> anyhow::Error {
    if e.no_face() {
        print_error("No face detected, retake the photo");
    }
    for field in e.field_errors() {
        print_error(&format!("{}: {}", field.field, field.message));
    }
    anyhow::Error::new(e)
}
