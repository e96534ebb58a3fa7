use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    BoundingBox, Contact, ContactFields, ContactRepository, Detection, Embedding, EnrollmentError,
    FaceExtractor, ImageBuffer,
};

/// A face captured for enrollment but not yet saved.
#[derive(Debug, Clone)]
pub struct CapturedFace {
    pub image: ImageBuffer,
    pub bbox: BoundingBox,
    pub score: f32,
    pub embedding: Embedding,
}

/// One-shot capture → extraction → validation → persistence.
pub struct Enroller {
    extractor: Arc<dyn FaceExtractor>,
    repo: Arc<dyn ContactRepository>,
}

impl Enroller {
    pub fn new(extractor: Arc<dyn FaceExtractor>, repo: Arc<dyn ContactRepository>) -> Self {
        Self { extractor, repo }
    }

    /// Detects the face in a captured photo.
    ///
    /// Returns [`EnrollmentError::NoFaceDetected`] when the photo has no
    /// usable face; the user retakes the photo.
    pub async fn capture(&self, image: &ImageBuffer) -> Result<CapturedFace, EnrollmentError> {
        match self.detect(image).await? {
            Some(face) => Ok(face),
            None => Err(EnrollmentError::NoFaceDetected),
        }
    }

    /// Validates the form and persists a previously captured face.
    pub async fn submit(
        &self,
        face: CapturedFace,
        fields: ContactFields,
    ) -> Result<Contact, EnrollmentError> {
        let problems = fields.validate();
        if !problems.is_empty() {
            return Err(EnrollmentError::ValidationFailed(problems));
        }
        self.persist(face, fields).await
    }

    /// Runs the whole pipeline on one photo.
    ///
    /// Detection and validation are both evaluated before failing, so the
    /// caller learns about a missing face and bad fields in one pass.
    pub async fn enroll(
        &self,
        image: &ImageBuffer,
        fields: ContactFields,
    ) -> Result<Contact, EnrollmentError> {
        let face = self.detect(image).await?;
        let problems = fields.validate();

        let face = match (face, problems.is_empty()) {
            (Some(face), true) => face,
            (Some(_), false) => return Err(EnrollmentError::ValidationFailed(problems)),
            (None, true) => return Err(EnrollmentError::NoFaceDetected),
            (None, false) => return Err(EnrollmentError::NoFaceAndInvalid(problems)),
        };
        self.persist(face, fields).await
    }

    async fn detect(&self, image: &ImageBuffer) -> Result<Option<CapturedFace>, EnrollmentError> {
        let detection = self
            .extractor
            .detect_single(image)
            .await
            .map_err(EnrollmentError::Extraction)?;

        match detection {
            Detection::Detected {
                bbox,
                score,
                embedding,
            } => {
                embedding
                    .ensure_dim(self.extractor.dimension())
                    .map_err(EnrollmentError::Extraction)?;
                debug!(score, "face captured");
                Ok(Some(CapturedFace {
                    image: image.clone(),
                    bbox,
                    score,
                    embedding,
                }))
            }
            Detection::NotDetected => {
                debug!("no face in captured image");
                Ok(None)
            }
        }
    }

    async fn persist(
        &self,
        face: CapturedFace,
        fields: ContactFields,
    ) -> Result<Contact, EnrollmentError> {
        let new = fields.into_new_contact(face.embedding, face.image);
        match self.repo.create(new).await {
            Ok(contact) => {
                info!(contact_id = %contact.id, name = %contact.name, "contact enrolled");
                Ok(contact)
            }
            Err(e) => {
                warn!(error = %e, "failed to save contact");
                Err(EnrollmentError::PersistenceFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{
        FaceDetection, FaceIdError, Interaction, MemoryRepository, NewContact, NewInteraction,
        RepositoryError,
    };

    const DIM: usize = 8;

    /// Returns a face for non-empty images, nothing for empty ones.
    struct StubExtractor {
        embedding_dim: usize,
    }

    #[async_trait]
    impl FaceExtractor for StubExtractor {
        async fn detect_single(&self, image: &ImageBuffer) -> Result<Detection, FaceIdError> {
            if image.is_empty() {
                return Ok(Detection::NotDetected);
            }
            Ok(Detection::Detected {
                bbox: BoundingBox::default(),
                score: 0.99,
                embedding: Embedding::from_vec(vec![0.5; self.embedding_dim])?,
            })
        }

        async fn detect_all(
            &self,
            _image: &ImageBuffer,
        ) -> Result<Vec<FaceDetection>, FaceIdError> {
            Ok(Vec::new())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    struct BrokenRepository;

    #[async_trait]
    impl ContactRepository for BrokenRepository {
        async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn get(&self, _id: &str) -> Result<Option<Contact>, RepositoryError> {
            Ok(None)
        }
        async fn create(&self, _new: NewContact) -> Result<Contact, RepositoryError> {
            Err(RepositoryError::Storage("upload failed".into()))
        }
        async fn touch_last_seen(
            &self,
            _id: &str,
            _at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn delete(&self, _id: &str) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn add_interaction(
            &self,
            new: NewInteraction,
        ) -> Result<Interaction, RepositoryError> {
            Err(RepositoryError::NotFound(new.contact_id))
        }
        async fn interactions_for(&self, _id: &str) -> Result<Vec<Interaction>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn setup() -> (Enroller, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let enroller = Enroller::new(Arc::new(StubExtractor { embedding_dim: DIM }), repo.clone());
        (enroller, repo)
    }

    fn photo() -> ImageBuffer {
        ImageBuffer::new("image/jpeg", vec![0xFFu8, 0xD8, 0xFF])
    }

    fn valid_fields() -> ContactFields {
        ContactFields {
            name: "Ada Lovelace".into(),
            company: "Analytical Engines".into(),
            tags: "math, engines".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn enroll_valid() {
        let (enroller, repo) = setup();
        let c = enroller.enroll(&photo(), valid_fields()).await.unwrap();
        assert_eq!(c.embedding.as_ref().unwrap().len(), DIM);
        assert_eq!(c.tags, vec!["math", "engines"]);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn enroll_no_face_creates_nothing() {
        let (enroller, repo) = setup();
        let err = enroller
            .enroll(&ImageBuffer::new("image/jpeg", Vec::<u8>::new()), valid_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::NoFaceDetected));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn enroll_reports_face_and_fields_together() {
        let (enroller, repo) = setup();
        let err = enroller
            .enroll(&ImageBuffer::new("image/jpeg", Vec::<u8>::new()), ContactFields::default())
            .await
            .unwrap_err();
        assert!(err.no_face());
        let fields: Vec<_> = err.field_errors().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["name", "company"]);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn enroll_invalid_fields_with_face() {
        let (enroller, repo) = setup();
        let mut fields = valid_fields();
        fields.company = "   ".into();
        let err = enroller.enroll(&photo(), fields).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::ValidationFailed(ref f) if f.len() == 1));
        assert!(!err.no_face());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn enroll_wrong_dimension_is_fatal() {
        let repo = Arc::new(MemoryRepository::new());
        let enroller = Enroller::new(Arc::new(StubExtractor { embedding_dim: 3 }), repo.clone());
        let err = enroller.enroll(&photo(), valid_fields()).await.unwrap_err();
        assert!(matches!(
            err,
            EnrollmentError::Extraction(FaceIdError::DimensionMismatch { .. })
        ));
        assert!(!err.is_recoverable());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let enroller = Enroller::new(
            Arc::new(StubExtractor { embedding_dim: DIM }),
            Arc::new(BrokenRepository),
        );
        let err = enroller.enroll(&photo(), valid_fields()).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::PersistenceFailed(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn capture_then_submit() {
        let (enroller, repo) = setup();
        assert!(matches!(
            enroller.capture(&ImageBuffer::new("image/png", Vec::<u8>::new())).await,
            Err(EnrollmentError::NoFaceDetected)
        ));

        let face = enroller.capture(&photo()).await.unwrap();
        assert_eq!(face.embedding.dim(), DIM);

        let err = enroller
            .submit(face.clone(), ContactFields::default())
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().len(), 2);

        let c = enroller.submit(face, valid_fields()).await.unwrap();
        assert_eq!(repo.get(&c.id).await.unwrap().unwrap().name, "Ada Lovelace");
    }
}
