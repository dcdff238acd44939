#[cfg(test)]
mod tests {
    use mirage::assets::{AssetKind, MediaMetadata};
    use mirage::client::{
        BackgroundRequest, ExtendRequest, GenerationRequest, GenerationService, JobHandle,
        JobPoll, RemoteArtifact, ServiceError, StitchRequest,
    };
    use mirage::config::Config;
    use mirage::controller::{AppController, ControllerError, Feature};
    use mirage::jobs::{JobError, PollConfig};
    use mirage::media::{MediaError, MediaToolkit};
    use mirage::timeline::{ClipStatus, VIDEO_TRACK};
    use mirage::AspectRatio;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // --- SCRIPTED COLLABORATOR ---

    struct ScriptedService {
        reject_submissions: AtomicBool,
        fail_advisory: AtomicBool,
        polls: Mutex<VecDeque<JobPoll>>,
        submissions: Mutex<Vec<String>>,
        captions_response: Mutex<String>,
        grade_response: Mutex<String>,
        scenes_response: Mutex<String>,
        job_counter: AtomicUsize,
        artifact_counter: AtomicUsize,
    }

    impl ScriptedService {
        fn fresh() -> Arc<Self> {
            Arc::new(Self {
                reject_submissions: AtomicBool::new(false),
                fail_advisory: AtomicBool::new(false),
                polls: Mutex::new(VecDeque::new()),
                submissions: Mutex::new(Vec::new()),
                captions_response: Mutex::new(
                    r#"[{"text":"first line","start":0.0,"end":1.0},
                        {"text":"second line","start":1.0,"end":2.0}]"#
                        .to_string(),
                ),
                grade_response: Mutex::new(
                    r#"{"saturation":1.3,"temperature":0.2}"#.to_string(),
                ),
                scenes_response: Mutex::new(
                    r#"{"scenes":[{"start":0.0,"end":3.0,"label":"opening"}]}"#.to_string(),
                ),
                job_counter: AtomicUsize::new(0),
                artifact_counter: AtomicUsize::new(0),
            })
        }

        fn script_polls(&self, polls: Vec<JobPoll>) {
            self.polls.lock().unwrap().extend(polls);
        }

        fn submissions(&self) -> Vec<String> {
            self.submissions.lock().unwrap().clone()
        }

        fn record_submission(&self, operation: &str) -> Result<JobHandle, ServiceError> {
            if self.reject_submissions.load(Ordering::SeqCst) {
                return Err(ServiceError::Rejected {
                    status: 400,
                    message: "malformed job spec".to_string(),
                });
            }
            self.submissions.lock().unwrap().push(operation.to_string());
            let id = self.job_counter.fetch_add(1, Ordering::SeqCst);
            Ok(JobHandle(format!("job-{}", id)))
        }

        fn advisory(&self, stored: &Mutex<String>) -> Result<String, ServiceError> {
            if self.fail_advisory.load(Ordering::SeqCst) {
                return Err(ServiceError::Rejected {
                    status: 503,
                    message: "analysis backend unavailable".to_string(),
                });
            }
            Ok(stored.lock().unwrap().clone())
        }
    }

    fn not_done() -> JobPoll {
        JobPoll::default()
    }

    fn failed(message: &str) -> JobPoll {
        JobPoll {
            done: true,
            result: None,
            error: Some(message.to_string()),
        }
    }

    impl GenerationService for ScriptedService {
        fn has_credential(&self) -> bool {
            true
        }

        async fn submit_generation(
            &self,
            _req: &GenerationRequest,
        ) -> Result<JobHandle, ServiceError> {
            self.record_submission("generate")
        }

        async fn submit_stitch(&self, _req: &StitchRequest) -> Result<JobHandle, ServiceError> {
            self.record_submission("stitch")
        }

        async fn submit_extend(&self, req: &ExtendRequest) -> Result<JobHandle, ServiceError> {
            self.record_submission(&format!("extend:{}", req.remote_handle))
        }

        async fn submit_background_replace(
            &self,
            req: &BackgroundRequest,
        ) -> Result<JobHandle, ServiceError> {
            self.record_submission(&format!("background:{}", req.target_color))
        }

        async fn poll_job(&self, _handle: &JobHandle) -> Result<JobPoll, ServiceError> {
            if let Some(scripted) = self.polls.lock().unwrap().pop_front() {
                return Ok(scripted);
            }
            // Unscripted polls succeed immediately with a fresh artifact
            let id = self.artifact_counter.fetch_add(1, Ordering::SeqCst);
            Ok(JobPoll {
                done: true,
                result: Some(RemoteArtifact {
                    handle: format!("remote-{}", id),
                    uri: format!("mem://remote-{}", id),
                }),
                error: None,
            })
        }

        async fn fetch_artifact(&self, _artifact: &RemoteArtifact) -> Result<Vec<u8>, ServiceError> {
            Ok(b"generated media bytes".to_vec())
        }

        async fn analyze_scenes(&self, _media: &[u8]) -> Result<String, ServiceError> {
            self.advisory(&self.scenes_response)
        }

        async fn generate_captions(&self, _media: &[u8]) -> Result<String, ServiceError> {
            self.advisory(&self.captions_response)
        }

        async fn suggest_color_grade(
            &self,
            _media: &[u8],
            _vibe: &str,
        ) -> Result<String, ServiceError> {
            self.advisory(&self.grade_response)
        }
    }

    // --- STUB MEDIA TOOLKIT ---

    #[derive(Clone, Default)]
    struct StubToolkit {
        frames_extracted: Arc<AtomicUsize>,
    }

    impl MediaToolkit for StubToolkit {
        fn probe(&self, _path: &Path) -> Result<MediaMetadata, MediaError> {
            Ok(MediaMetadata {
                duration: Some(6.0),
                width: Some(1280),
                height: Some(720),
                codec: Some("h264".to_string()),
            })
        }

        fn extract_frame(&self, _path: &Path, _at_seconds: f64) -> Result<Vec<u8>, MediaError> {
            self.frames_extracted.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0u8; 16])
        }
    }

    // --- FIXTURES ---

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mirage_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config(media_dir: PathBuf, interval_ms: u64) -> Config {
        Config {
            api_base: "http://127.0.0.1:9999".to_string(),
            api_key: "test-key".to_string(),
            media_dir,
            artifact_dir: None,
            poll: PollConfig {
                interval: Duration::from_millis(interval_ms),
                max_wait: Duration::from_secs(2),
            },
            default_aspect: AspectRatio::Widescreen,
        }
    }

    fn build_controller(
        service: Arc<ScriptedService>,
        interval_ms: u64,
    ) -> (AppController<ScriptedService, StubToolkit>, StubToolkit, PathBuf) {
        let toolkit = StubToolkit::default();
        let dir = temp_dir();
        let controller =
            AppController::new(service, toolkit.clone(), test_config(dir.clone(), interval_ms));
        (controller, toolkit, dir)
    }

    fn write_fake_media(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, b"fake local media").unwrap();
        path.to_string_lossy().to_string()
    }

    // --- EDIT FEATURE SCENARIOS ---

    #[tokio::test]
    async fn test_generate_inserts_placeholder_then_finalizes() {
        let service = ScriptedService::fresh();
        service.script_polls(vec![not_done(), not_done()]);
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 20);

        let (result, mid_timeline) = tokio::join!(
            controller.generate("a sunset over the sea", None, None),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                controller.timeline()
            }
        );

        // While the job polls, the optimistic placeholder is already visible
        assert_eq!(mid_timeline.clips.len(), 1);
        assert_eq!(mid_timeline.clips[0].status, ClipStatus::Generating);
        assert!(mid_timeline.clips[0].asset_id.is_none());
        assert!(!mid_timeline.clips[0].is_playable());

        let clip = result.expect("generation should succeed");
        assert_eq!(clip.status, ClipStatus::Ready);
        assert!(clip.is_playable());
        // Placeholder hint replaced by the probed duration
        assert_eq!(clip.duration, 6.0);

        // Exactly one new asset, and the same clip id now binds it
        let assets = controller.assets();
        assert_eq!(assets.len(), 1);
        let timeline = controller.timeline();
        assert_eq!(timeline.clips.len(), 1);
        assert_eq!(timeline.clips[0].id, clip.id);
        assert_eq!(timeline.clips[0].asset_id, clip.asset_id);
        assert!(assets.iter().next().unwrap().remote_handle.is_some());
    }

    #[tokio::test]
    async fn test_rejected_submission_leaves_nothing_behind() {
        let service = ScriptedService::fresh();
        service.reject_submissions.store(true, Ordering::SeqCst);
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 5);

        let err = controller.generate("sunset", None, None).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Job(JobError::Submission(_))
        ));

        // No placeholder, no history entry, no asset
        assert!(controller.timeline().clips.is_empty());
        assert!(controller.assets().is_empty());
        assert!(!controller.can_undo());
    }

    #[tokio::test]
    async fn test_generation_failure_marks_clip_error_and_releases_busy() {
        let service = ScriptedService::fresh();
        service.script_polls(vec![failed("safety filter rejected the prompt")]);
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 5);

        let err = controller.generate("sunset", None, None).await.unwrap_err();
        match err {
            ControllerError::Job(JobError::Generation(message)) => {
                assert!(message.contains("safety filter"))
            }
            other => panic!("expected Generation error, got {:?}", other),
        }

        // The errored placeholder stays visible instead of vanishing
        let timeline = controller.timeline();
        assert_eq!(timeline.clips.len(), 1);
        assert_eq!(timeline.clips[0].status, ClipStatus::Error);
        assert!(controller.assets().is_empty());

        // The busy flag was released: the retry goes through
        let clip = controller.generate("sunset", None, None).await.unwrap();
        assert_eq!(clip.status, ClipStatus::Ready);
        assert_eq!(controller.timeline().clips.len(), 2);
    }

    #[tokio::test]
    async fn test_extend_without_remote_handle_is_rejected_upfront() {
        let service = ScriptedService::fresh();
        let (controller, _toolkit, dir) = build_controller(service.clone(), 5);

        // One uploaded image and one uploaded video; neither came from the
        // service, so neither carries a remote handle
        let image_path = write_fake_media(&dir, "poster.png");
        controller.import_media(&image_path, AssetKind::Image);
        let video_path = write_fake_media(&dir, "upload.mp4");
        let video = controller.import_media(&video_path, AssetKind::Video);
        let clip = controller.add_clip(&video.id, VIDEO_TRACK).unwrap();
        controller.select_clip(Some(&clip.id));

        let err = controller.extend("keep going", None).await.unwrap_err();
        match err {
            ControllerError::MissingRemoteHandle(id) => assert_eq!(id, clip.id),
            other => panic!("expected MissingRemoteHandle, got {:?}", other),
        }

        // Nothing was submitted and no placeholder was inserted
        assert!(service.submissions().is_empty());
        assert_eq!(controller.timeline().clips.len(), 1);

        // And the failure did not leave the feature stuck busy
        let err = controller.extend("keep going", None).await.unwrap_err();
        assert!(matches!(err, ControllerError::MissingRemoteHandle(_)));
    }

    #[tokio::test]
    async fn test_extend_targets_selected_clip_and_records_lineage() {
        let service = ScriptedService::fresh();
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 5);

        let first = controller.generate("seed clip", None, None).await.unwrap();
        controller.select_clip(Some(&first.id));

        let extended = controller.extend("and then the storm", None).await.unwrap();
        assert_eq!(extended.extended_from.as_deref(), Some(first.id.as_str()));
        assert_eq!(extended.status, ClipStatus::Ready);
        // Appended after the source clip
        assert!(extended.start >= first.duration);

        assert_eq!(controller.assets().len(), 2);
        let submissions = service.submissions();
        assert!(submissions.iter().any(|s| s.starts_with("extend:remote-")));
    }

    #[tokio::test]
    async fn test_stitch_bridges_last_two_ready_clips() {
        let service = ScriptedService::fresh();
        let (controller, toolkit, _dir) = build_controller(service.clone(), 5);

        // Policy check: nothing to bridge yet
        let err = controller.stitch("crossfade", None).await.unwrap_err();
        assert!(matches!(err, ControllerError::NotEnoughClips));
        assert!(service.submissions().is_empty());

        controller.generate("first", None, None).await.unwrap();
        controller.generate("second", None, None).await.unwrap();

        let bridge = controller.stitch("crossfade", None).await.unwrap();
        assert_eq!(bridge.status, ClipStatus::Ready);
        assert_eq!(controller.timeline().clips.len(), 3);
        // One frame from the end of A, one from the start of B
        assert_eq!(toolkit.frames_extracted.load(Ordering::SeqCst), 2);
        assert!(service.submissions().contains(&"stitch".to_string()));
    }

    #[tokio::test]
    async fn test_remove_background_swaps_asset_in_place() {
        let service = ScriptedService::fresh();
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 5);

        let clip = controller.generate("subject on set", None, None).await.unwrap();
        let original_asset = clip.asset_id.clone().unwrap();

        let updated = controller
            .remove_background(&clip.id, "#00ff00")
            .await
            .unwrap();

        // Same clip, new asset, ready again
        assert_eq!(updated.id, clip.id);
        assert_eq!(updated.status, ClipStatus::Ready);
        assert_ne!(updated.asset_id.as_ref().unwrap(), &original_asset);
        assert_eq!(
            updated.attributes.background.as_ref().unwrap().target_color,
            "#00ff00"
        );

        // No extra clip was inserted; the superseded asset is retained
        assert_eq!(controller.timeline().clips.len(), 1);
        assert_eq!(controller.assets().len(), 2);
        assert!(service
            .submissions()
            .contains(&"background:#00ff00".to_string()));
    }

    #[tokio::test]
    async fn test_same_feature_is_busy_while_job_in_flight() {
        let service = ScriptedService::fresh();
        service.script_polls(vec![not_done(), not_done(), not_done()]);
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 20);

        let (first, second) = tokio::join!(controller.generate("one", None, None), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            controller.generate("two", None, None).await
        });

        assert!(first.is_ok());
        match second.unwrap_err() {
            ControllerError::Busy(feature) => assert_eq!(feature, Feature::Generate),
            other => panic!("expected Busy, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_marks_clip_error() {
        let service = ScriptedService::fresh();
        service.script_polls(vec![not_done(); 50]);
        let (controller, _toolkit, _dir) = build_controller(service.clone(), 20);

        let (result, cancelled) = tokio::join!(controller.generate("slow", None, None), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let jobs = controller.active_jobs();
            assert_eq!(jobs.len(), 1);
            controller.cancel_job(&jobs[0])
        });

        assert!(cancelled);
        assert!(matches!(
            result.unwrap_err(),
            ControllerError::Job(JobError::Cancelled)
        ));
        let timeline = controller.timeline();
        assert_eq!(timeline.clips.len(), 1);
        assert_eq!(timeline.clips[0].status, ClipStatus::Error);
    }

    // --- ADVISORY SCENARIOS ---

    #[tokio::test]
    async fn test_concurrent_advisories_both_land() {
        let service = ScriptedService::fresh();
        let (controller, _toolkit, dir) = build_controller(service.clone(), 5);

        let path = write_fake_media(&dir, "footage.mp4");
        let asset = controller.import_media(&path, AssetKind::Video);
        let clip = controller.add_clip(&asset.id, VIDEO_TRACK).unwrap();

        let (captions, grade) = tokio::join!(
            controller.generate_captions(&clip.id),
            controller.suggest_color_grade(&clip.id, "warm dusk")
        );

        let captions = captions.unwrap();
        let grade = grade.unwrap();
        assert_eq!(captions.len(), 2);
        assert_eq!(grade.saturation, 1.3);

        // Both attribute sets are present afterwards; neither overwrote the other
        let timeline = controller.timeline();
        let stored = timeline.find_clip(&clip.id).unwrap();
        assert_eq!(stored.attributes.captions.as_ref().unwrap().len(), 2);
        assert_eq!(
            stored.attributes.color_grade.as_ref().unwrap().saturation,
            1.3
        );
    }

    #[tokio::test]
    async fn test_unparseable_advisory_falls_back_to_neutral() {
        let service = ScriptedService::fresh();
        *service.captions_response.lock().unwrap() =
            "Sorry, I could not find any speech.".to_string();
        let (controller, _toolkit, dir) = build_controller(service.clone(), 5);

        let path = write_fake_media(&dir, "silent.mp4");
        let asset = controller.import_media(&path, AssetKind::Video);
        let clip = controller.add_clip(&asset.id, VIDEO_TRACK).unwrap();

        let captions = controller.generate_captions(&clip.id).await.unwrap();
        assert!(captions.is_empty());

        // The clip took the neutral result; nothing else changed
        let timeline = controller.timeline();
        let stored = timeline.find_clip(&clip.id).unwrap();
        assert_eq!(stored.attributes.captions.as_deref(), Some(&[][..]));
        assert_eq!(stored.status, ClipStatus::Ready);
    }

    #[tokio::test]
    async fn test_advisory_service_failure_does_not_touch_the_clip() {
        let service = ScriptedService::fresh();
        service.fail_advisory.store(true, Ordering::SeqCst);
        let (controller, _toolkit, dir) = build_controller(service.clone(), 5);

        let path = write_fake_media(&dir, "footage.mp4");
        let asset = controller.import_media(&path, AssetKind::Video);
        let clip = controller.add_clip(&asset.id, VIDEO_TRACK).unwrap();

        let err = controller.scan_scenes(&clip.id).await.unwrap_err();
        assert!(matches!(err, ControllerError::Advisory(_)));

        let timeline = controller.timeline();
        let stored = timeline.find_clip(&clip.id).unwrap();
        assert!(stored.attributes.scene_markers.is_none());
        assert_eq!(stored.status, ClipStatus::Ready);

        // Busy flag cleared; the retry works once the backend recovers
        service.fail_advisory.store(false, Ordering::SeqCst);
        let markers = controller.scan_scenes(&clip.id).await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label.as_deref(), Some("opening"));
    }

    #[tokio::test]
    async fn test_analyze_clip_runs_all_three_advisories() {
        let service = ScriptedService::fresh();
        let (controller, _toolkit, dir) = build_controller(service.clone(), 5);

        let path = write_fake_media(&dir, "footage.mp4");
        let asset = controller.import_media(&path, AssetKind::Video);
        let clip = controller.add_clip(&asset.id, VIDEO_TRACK).unwrap();

        let (captions, grade, scenes) = controller.analyze_clip(&clip.id, "noir").await;
        assert_eq!(captions.unwrap().len(), 2);
        assert_eq!(grade.unwrap().temperature, 0.2);
        assert_eq!(scenes.unwrap().len(), 1);

        let timeline = controller.timeline();
        let stored = timeline.find_clip(&clip.id).unwrap();
        assert!(stored.attributes.captions.is_some());
        assert!(stored.attributes.color_grade.is_some());
        assert!(stored.attributes.scene_markers.is_some());
    }
}
