//! Analysis orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use uuid::Uuid;

use super::error::AnalysisError;
use super::fetch::ImageFetcher;
use super::lock::AnalysisLocks;
use super::scratch::{ScratchFile, extension_of};
use crate::auth::Caller;
use crate::classifier::Classifier;
use crate::image::{Classification, Image, ImageRepository, NewClassification};

/// Runs analyses of uploaded images.
///
/// Cheap to share: every field is an `Arc` or a handle onto shared state.
pub struct AnalysisService<R, F, C> {
    repo: Arc<R>,
    fetcher: Arc<F>,
    classifier: Arc<C>,
    locks: AnalysisLocks,
    scratch_dir: PathBuf,
}

impl<R, F, C> Clone for AnalysisService<R, F, C> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            fetcher: Arc::clone(&self.fetcher),
            classifier: Arc::clone(&self.classifier),
            locks: self.locks.clone(),
            scratch_dir: self.scratch_dir.clone(),
        }
    }
}

impl<R, F, C> AnalysisService<R, F, C>
where
    R: ImageRepository,
    F: ImageFetcher,
    C: Classifier,
{
    /// Create a new analysis service.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        fetcher: Arc<F>,
        classifier: Arc<C>,
        locks: AnalysisLocks,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            classifier,
            locks,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Classify an image and make the result its current classification.
    ///
    /// On success exactly one new classification exists for the image and
    /// any previous one is gone. On failure nothing is persisted. The scratch
    /// copy is removed on every path.
    pub async fn analyze(
        &self,
        image_id: Uuid,
        caller: &Caller,
    ) -> Result<Classification, AnalysisError> {
        let image = self
            .repo
            .find_by_id(image_id)
            .await?
            .ok_or(AnalysisError::NotFound(image_id))?;

        if !caller.can_access(image.user_id) {
            return Err(AnalysisError::Forbidden(image_id));
        }

        let _guard = self
            .locks
            .try_acquire(image_id)
            .ok_or(AnalysisError::InProgress(image_id))?;

        let (scratch, file) = ScratchFile::create(&self.scratch_dir, extension_of(&image.file_name))
            .await
            .map_err(AnalysisError::Scratch)?;

        let outcome = self.run(&image, &scratch, file).await;
        scratch.remove().await;

        match &outcome {
            Ok(classification) => tracing::info!(
                image_id = %image_id,
                classification_id = %classification.id,
                label = %classification.label,
                confidence = %classification.confidence,
                "image analyzed"
            ),
            Err(e) => tracing::warn!(image_id = %image_id, code = e.error_code(), error = %e, "analysis failed"),
        }

        outcome
    }

    async fn run(
        &self,
        image: &Image,
        scratch: &ScratchFile,
        mut file: File,
    ) -> Result<Classification, AnalysisError> {
        self.fetcher.fetch_into(&image.url, &mut file).await?;
        // Closed before the classifier opens it.
        drop(file);

        let verdict = self.classifier.classify(scratch.path()).await?;

        let classification = self
            .repo
            .create_classification(NewClassification {
                image_id: image.id,
                label: verdict.label,
                confidence: verdict.confidence,
                details: verdict.details,
            })
            .await?;

        let attached = self
            .repo
            .attach_classification(image.id, image.classification_id, classification.id)
            .await;

        match attached {
            Ok(true) => Ok(classification),
            Ok(false) => {
                self.discard(classification.id).await;
                Err(AnalysisError::Superseded(image.id))
            }
            Err(e) => {
                self.discard(classification.id).await;
                Err(e.into())
            }
        }
    }

    async fn discard(&self, classification_id: Uuid) {
        if let Err(e) = self.repo.delete_classification(classification_id).await {
            tracing::warn!(classification_id = %classification_id, error = %e, "failed to discard unattached classification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FetchError;
    use crate::auth::UserRole;
    use crate::classifier::{
        ClassificationLabel, EDIBLE_DETAILS, InvocationFailure, ResolvedVerdict, interpret,
    };
    use crate::test_support::InMemoryImageRepository;
    use rust_decimal_macros::dec;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWriteExt;
    use tokio::sync::Notify;

    const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";

    /// Writes fixed bytes, or fails like an unreachable store.
    struct FakeFetcher {
        fail: bool,
    }

    impl ImageFetcher for FakeFetcher {
        async fn fetch_into(&self, _url: &str, dest: &mut File) -> Result<u64, FetchError> {
            if self.fail {
                return Err(FetchError::Status(503));
            }
            dest.write_all(IMAGE_BYTES).await?;
            dest.flush().await?;
            Ok(IMAGE_BYTES.len() as u64)
        }
    }

    enum Behavior {
        Stdout(&'static str),
        Fail,
        /// Blocks until released, after signalling entry.
        Gate {
            entered: Arc<Notify>,
            release: Arc<Notify>,
        },
        /// Lets another writer attach a classification first.
        Race(Arc<InMemoryImageRepository>),
    }

    struct FakeClassifier {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
            }
        }
    }

    const EDIBLE_STDOUT: &str =
        r#"{"is_mushroom": true, "classification": "Edible", "confidence": "91.50%"}"#;

    impl Classifier for FakeClassifier {
        async fn classify(&self, image_path: &Path) -> Result<ResolvedVerdict, InvocationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(std::fs::read(image_path).unwrap(), IMAGE_BYTES);

            match &self.behavior {
                Behavior::Stdout(stdout) => interpret(stdout),
                Behavior::Fail => Err(InvocationFailure::NonZeroExit {
                    code: Some(1),
                    stderr: "model load error".to_string(),
                }),
                Behavior::Gate { entered, release } => {
                    entered.notify_one();
                    release.notified().await;
                    interpret(EDIBLE_STDOUT)
                }
                Behavior::Race(repo) => {
                    let image_id = repo.list(None).await.unwrap()[0].image.id;
                    repo.force_attach(image_id);
                    interpret(EDIBLE_STDOUT)
                }
            }
        }
    }

    struct Fixture {
        service: AnalysisService<InMemoryImageRepository, FakeFetcher, FakeClassifier>,
        repo: Arc<InMemoryImageRepository>,
        classifier: Arc<FakeClassifier>,
        scratch: tempfile::TempDir,
        owner: Caller,
        image: Image,
    }

    fn fixture_with(behavior: Behavior, fetch_fails: bool, repo: Arc<InMemoryImageRepository>) -> Fixture {
        let owner = Caller::new(Uuid::new_v4(), UserRole::User);
        let image = repo.insert_image(owner.user_id, "http://store/images/photo.jpg");
        let classifier = Arc::new(FakeClassifier::new(behavior));
        let scratch = tempfile::tempdir().unwrap();
        let service = AnalysisService::new(
            Arc::clone(&repo),
            Arc::new(FakeFetcher { fail: fetch_fails }),
            Arc::clone(&classifier),
            AnalysisLocks::new(),
            scratch.path(),
        );
        Fixture {
            service,
            repo,
            classifier,
            scratch,
            owner,
            image,
        }
    }

    fn fixture(behavior: Behavior) -> Fixture {
        fixture_with(behavior, false, Arc::new(InMemoryImageRepository::default()))
    }

    fn scratch_is_empty(f: &Fixture) -> bool {
        std::fs::read_dir(f.scratch.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_successful_analysis_attaches_one_classification() {
        let f = fixture(Behavior::Stdout(EDIBLE_STDOUT));

        let classification = f.service.analyze(f.image.id, &f.owner).await.unwrap();

        assert_eq!(classification.label, ClassificationLabel::Edible);
        assert_eq!(classification.confidence, dec!(0.915));
        assert_eq!(classification.details, EDIBLE_DETAILS);

        let image = f.repo.find_by_id(f.image.id).await.unwrap().unwrap();
        assert!(image.analyzed);
        assert_eq!(image.classification_id, Some(classification.id));
        assert_eq!(f.repo.classifications_for(f.image.id).len(), 1);
        assert!(scratch_is_empty(&f));
    }

    #[tokio::test]
    async fn test_classifier_failure_persists_nothing() {
        let f = fixture(Behavior::Fail);

        let err = f.service.analyze(f.image.id, &f.owner).await.unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Classifier(InvocationFailure::NonZeroExit { .. })
        ));
        let image = f.repo.find_by_id(f.image.id).await.unwrap().unwrap();
        assert!(!image.analyzed);
        assert!(f.repo.classifications_for(f.image.id).is_empty());
        assert!(scratch_is_empty(&f));
    }

    #[tokio::test]
    async fn test_download_failure_skips_classifier() {
        let f = fixture_with(
            Behavior::Stdout(EDIBLE_STDOUT),
            true,
            Arc::new(InMemoryImageRepository::default()),
        );

        let err = f.service.analyze(f.image.id, &f.owner).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Download(FetchError::Status(503))));
        assert_eq!(f.classifier.calls.load(Ordering::SeqCst), 0);
        assert!(scratch_is_empty(&f));
    }

    #[tokio::test]
    async fn test_unrecognized_label_is_not_stored() {
        let f = fixture(Behavior::Stdout(
            r#"{"is_mushroom": true, "classification": "unknown", "confidence": 0.4}"#,
        ));

        let err = f.service.analyze(f.image.id, &f.owner).await.unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Classifier(InvocationFailure::UnrecognizedLabel { .. })
        ));
        assert!(f.repo.classifications_for(f.image.id).is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_and_stranger() {
        let f = fixture(Behavior::Stdout(EDIBLE_STDOUT));
        let stranger = Caller::new(Uuid::new_v4(), UserRole::User);
        let admin = Caller::new(Uuid::new_v4(), UserRole::Admin);

        assert!(matches!(
            f.service.analyze(Uuid::new_v4(), &f.owner).await,
            Err(AnalysisError::NotFound(_))
        ));
        assert!(matches!(
            f.service.analyze(f.image.id, &stranger).await,
            Err(AnalysisError::Forbidden(_))
        ));
        assert_eq!(f.classifier.calls.load(Ordering::SeqCst), 0);
        assert!(f.service.analyze(f.image.id, &admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_reanalysis_replaces_previous_classification() {
        let f = fixture(Behavior::Stdout(EDIBLE_STDOUT));

        let first = f.service.analyze(f.image.id, &f.owner).await.unwrap();
        let second = f.service.analyze(f.image.id, &f.owner).await.unwrap();

        let remaining = f.repo.classifications_for(f.image.id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
        assert!(f.repo.find_classification(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_analysis_conflicts() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let f = fixture(Behavior::Gate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });

        let first = {
            let service = f.service.clone();
            let owner = f.owner;
            let image_id = f.image.id;
            tokio::spawn(async move { service.analyze(image_id, &owner).await })
        };
        entered.notified().await;

        let second = f.service.analyze(f.image.id, &f.owner).await;
        assert!(matches!(second, Err(AnalysisError::InProgress(_))));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(f.service.analyze(f.image.id, &f.owner).await.is_ok());
        assert!(scratch_is_empty(&f));
    }

    #[tokio::test]
    async fn test_lost_compare_and_swap_discards_new_classification() {
        let repo = Arc::new(InMemoryImageRepository::default());
        let f = fixture_with(Behavior::Race(Arc::clone(&repo)), false, repo);

        let err = f.service.analyze(f.image.id, &f.owner).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Superseded(_)));
        let remaining = f.repo.classifications_for(f.image.id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].label, ClassificationLabel::Deadly);
        assert!(scratch_is_empty(&f));
    }
}
