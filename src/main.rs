use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use paici::capture::{CaptureSource, FileCapture};
use paici::config::{CompositorConfig, LayerStyle, MaskFilter, PipelineConfig, RecognitionConfig};
use paici::output::{ImageFileOutput, OutputSink};
use paici::recognition::{Recognizer, StaticRecognizer};
use paici::segmentation::{Segmenter, SubjectProcessor};
use paici::session::{Capabilities, CaptureService, CaptureSession, Collaborators, SessionSnapshot};
use paici::vocab::{Lexicon, MemoryWordStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Decision {
    Accept,
    Retake,
    Discard,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photo to capture from
    #[arg(short, long, conflicts_with = "device")]
    image: Option<PathBuf>,

    /// Webcam device index (requires the `webcam` feature)
    #[arg(short, long)]
    device: Option<u32>,

    /// Path to segmentation model (ONNX file)
    /// If not provided, results show the original photo
    #[arg(long)]
    segmenter_model: Option<PathBuf>,

    /// Path to classifier model (ONNX file), used with --labels
    #[arg(long, requires = "labels", conflicts_with = "label")]
    classifier_model: Option<PathBuf>,

    /// Newline-separated class names for the classifier
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Use this label instead of running a classifier
    #[arg(long)]
    label: Option<String>,

    /// Extra lexicon entries: label<TAB>translation<TAB>phonetic
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Where to write the displayable image
    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// What to do with the result
    #[arg(long, value_enum, default_value_t = Decision::Accept)]
    decision: Decision,

    /// Minimum label confidence
    #[arg(long, default_value_t = 0.65)]
    min_confidence: f32,

    /// Foreground coverage below which no composite is drawn
    #[arg(long, default_value_t = 0.05)]
    coverage_threshold: f64,

    /// Glow blur radius in pixels
    #[arg(long, default_value_t = 24.0)]
    glow_radius: f32,

    /// Outline blur radius in pixels
    #[arg(long, default_value_t = 6.0)]
    outline_radius: f32,

    /// Mask upscaling filter (nearest or bilinear)
    #[arg(long, default_value = "bilinear")]
    mask_filter: MaskFilter,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = CompositorConfig::default();
        PipelineConfig {
            compositor: CompositorConfig {
                coverage_threshold: self.coverage_threshold,
                glow: LayerStyle {
                    radius: self.glow_radius,
                    ..defaults.glow
                },
                outline: LayerStyle {
                    radius: self.outline_radius,
                    ..defaults.outline
                },
                ..defaults
            },
            mask_filter: self.mask_filter,
            recognition: RecognitionConfig {
                min_confidence: self.min_confidence,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Paici starting");

    let config = args.pipeline_config();
    let mut source = open_source(&args)?;
    let (width, height) = source.resolution();
    tracing::info!("Capture: {}x{}", width, height);

    let mut lexicon = Lexicon::builtin();
    if let Some(path) = &args.lexicon {
        let added = lexicon.extend_from_tsv(path)?;
        tracing::info!("Loaded {} lexicon entries from {}", added, path.display());
    }

    let capabilities = Capabilities {
        recognizer: load_recognizer(&args, &config),
        processor: Arc::new(SubjectProcessor::new(load_segmenter(&args), &config)),
    };
    let store = Arc::new(MemoryWordStore::new());
    let service = CaptureService::spawn(
        CaptureSession::new(lexicon),
        capabilities,
        Collaborators {
            store: store.clone(),
            translator: None,
        },
    );

    let start = Instant::now();
    let frame = source.capture_frame().context("Failed to capture photo")?;
    if service.capture(frame).await?.is_none() {
        bail!("Capture was not started");
    }

    let snapshot = service.settled().await?;
    tracing::info!("Processed in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    match snapshot {
        SessionSnapshot::Result(result) => {
            tracing::info!(
                "{}  {}  {}{}",
                result.label,
                result.phonetic,
                result.translation,
                if result.composite.is_some() {
                    ""
                } else {
                    "  (original image)"
                }
            );
            ImageFileOutput::new(&args.output).write_image(result.displayable())?;

            match args.decision {
                Decision::Accept => service.accept()?,
                Decision::Retake => service.retake()?,
                Decision::Discard => service.discard()?,
            }
        }
        _ => tracing::info!("Nothing recognized, back to viewfinder"),
    }

    service.shutdown().await;

    for word in store.words() {
        tracing::info!("Word {}: {} = {}", word.id, word.english, word.chinese);
    }

    Ok(())
}

fn open_source(args: &Args) -> Result<Box<dyn CaptureSource>> {
    if let Some(path) = &args.image {
        return Ok(Box::new(FileCapture::new(path)?));
    }
    match args.device {
        #[cfg(feature = "webcam")]
        Some(index) => Ok(Box::new(
            paici::capture::WebcamCapture::new(index).context("Failed to initialize webcam capture")?,
        )),
        #[cfg(not(feature = "webcam"))]
        Some(_) => bail!("Webcam capture requires the `webcam` feature"),
        None => bail!("Either --image or --device is required"),
    }
}

/// Missing or broken capabilities are logged, not fatal: the session
/// degrades instead.
fn load_recognizer(args: &Args, config: &PipelineConfig) -> Option<Arc<dyn Recognizer>> {
    if let Some(label) = &args.label {
        return Some(Arc::new(StaticRecognizer::new(label.clone())));
    }
    let model = args.classifier_model.as_ref()?;

    #[cfg(feature = "onnx")]
    {
        let labels = args.labels.as_ref()?;
        match paici::recognition::OnnxClassifier::new(model, labels, config.recognition.min_confidence) {
            Ok(classifier) => Some(Arc::new(classifier)),
            Err(err) => {
                tracing::warn!("Classifier unavailable: {:#}", err);
                None
            }
        }
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = config;
        tracing::warn!(
            "Classifier {} ignored: built without the `onnx` feature",
            model.display()
        );
        None
    }
}

fn load_segmenter(args: &Args) -> Option<Arc<dyn Segmenter>> {
    let model = args.segmenter_model.as_ref()?;

    #[cfg(feature = "onnx")]
    {
        match paici::segmentation::create_default_segmenter(&model.to_string_lossy()) {
            Ok(segmenter) => Some(segmenter),
            Err(err) => {
                tracing::warn!("Segmenter unavailable: {:#}", err);
                None
            }
        }
    }
    #[cfg(not(feature = "onnx"))]
    {
        tracing::warn!(
            "Segmenter {} ignored: built without the `onnx` feature",
            model.display()
        );
        None
    }
}
