use rand::Rng;

use crate::assets::{AssetError, AssetSource, ManifestCache, illustration_path};
use crate::audio::{AudioBackend, AudioBank};
use crate::catalog::{course_by_slug, random_course};
use crate::config::PuzzleConfig;
use crate::document::{Document, DocumentError, NodeId};
use crate::extract::{Extraction, Rejection, extract_pieces};
use crate::geometry::{LayoutEngine, Point, ViewBox};
use crate::interaction::{Board, EventOutcome, OutlineStyle, PuzzleEvent};
use crate::normalize::{Normalizer, Warning, uniquify_ids};
use crate::palette::Palette;
use crate::scoring::{Cue, PixelBuffer, Rasterizer, ScoreBoard, match_score};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CourseSelected,
    ProblemLoading,
    ProblemReady,
    Interacting,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown course '{0}'")]
    UnknownCourse(String),
    #[error("no course selected")]
    NoCourse,
    #[error("course '{course}' lists no illustrations")]
    EmptyCourse { course: String },
    #[error("no problem loaded")]
    NoProblem,
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub struct Problem<L> {
    path: String,
    reference: Document,
    working: Document,
    view_box: ViewBox,
    warnings: Vec<Warning>,
    rejected: Vec<(NodeId, Rejection)>,
    board: Board,
    palette: Palette,
    layout: Option<L>,
    reference_pixels: Option<PixelBuffer>,
    scores: ScoreBoard,
}

impl<L> Problem<L> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reference(&self) -> &Document {
        &self.reference
    }

    pub fn working(&self) -> &Document {
        &self.working
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn rejected(&self) -> &[(NodeId, Rejection)] {
        &self.rejected
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn layout(&self) -> Option<&L> {
        self.layout.as_ref()
    }

    pub fn scores(&self) -> ScoreBoard {
        self.scores
    }

    pub fn is_scoreable(&self) -> bool {
        self.reference_pixels.is_some()
    }
}

/// Normalizes `text` and sets it up for play.
///
/// Only a document that does not parse is an error. A layout failure leaves
/// the problem without pieces and a reference raster failure leaves it
/// without scoring.
pub async fn build_problem<E, R>(
    engine: &E,
    config: &PuzzleConfig,
    rng: &mut R,
    path: &str,
    text: &str,
) -> Result<Problem<E::Layout>, DocumentError>
where
    E: Rasterizer + LayoutEngine,
    R: Rng + ?Sized,
{
    let mut working = Document::parse(text)?;
    let report = Normalizer::new(config.id_length).normalize(&mut working, rng);
    let reference = working.clone();
    // both copies share one page, so the working copy gets its own ids
    uniquify_ids(&mut working, rng, config.id_length);

    let layout = match engine.layout(&working) {
        Ok(layout) => Some(layout),
        Err(err) => {
            tracing::warn!(path, %err, "layout failed, problem has no pieces");
            None
        }
    };
    let Extraction { pieces, rejected } = match &layout {
        Some(layout) => extract_pieces(&mut working, layout, config.area_ratio),
        None => Extraction::default(),
    };
    let palette = Palette::from_pieces(&working, &pieces, &config.fallback_color, rng);
    let outline = OutlineStyle::scaled(
        &config.canvas_fill,
        &config.outline_stroke,
        report.view_box.height,
        config.display_px,
    );
    let board = Board::prepare(&mut working, &pieces, &outline);

    let reference_pixels = match engine.rasterize(&reference, config.raster).await {
        Ok(pixels) => Some(pixels),
        Err(err) => {
            tracing::warn!(path, %err, "reference raster failed, scoring disabled");
            None
        }
    };
    tracing::info!(
        path,
        pieces = board.len(),
        colors = palette.len(),
        warnings = report.warnings.len(),
        "problem ready"
    );
    Ok(Problem {
        path: path.to_string(),
        reference,
        working,
        view_box: report.view_box,
        warnings: report.warnings,
        rejected,
        board,
        palette,
        layout,
        reference_pixels,
        scores: ScoreBoard::new(config.clear_score),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub outcome: EventOutcome,
    pub score: Option<u8>,
    pub cue: Option<Cue>,
}

pub struct Session<S, E, A, R>
where
    S: AssetSource,
    E: Rasterizer + LayoutEngine,
    A: AudioBackend,
    R: Rng,
{
    config: PuzzleConfig,
    assets: S,
    engine: E,
    audio: AudioBank<A>,
    rng: R,
    manifests: ManifestCache,
    course: Option<String>,
    phase: Phase,
    problem: Option<Problem<E::Layout>>,
}

impl<S, E, A, R> Session<S, E, A, R>
where
    S: AssetSource,
    E: Rasterizer + LayoutEngine,
    A: AudioBackend,
    R: Rng,
{
    pub fn new(config: PuzzleConfig, assets: S, engine: E, audio: A, rng: R) -> Self {
        Self {
            config,
            assets,
            engine,
            audio: AudioBank::new(audio),
            rng,
            manifests: ManifestCache::default(),
            course: None,
            phase: Phase::Idle,
            problem: None,
        }
    }

    pub fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn course(&self) -> Option<&str> {
        self.course.as_deref()
    }

    pub fn problem(&self) -> Option<&Problem<E::Layout>> {
        self.problem.as_ref()
    }

    pub fn audio(&self) -> &AudioBank<A> {
        &self.audio
    }

    pub fn manifests(&self) -> &ManifestCache {
        &self.manifests
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn user_input(&mut self) {
        if self.audio.unlock().await {
            tracing::debug!("audio unlocked");
        }
    }

    pub async fn select_course(&mut self, slug: &str) -> Result<&Problem<E::Layout>, SessionError> {
        let entry = course_by_slug(slug).ok_or_else(|| SessionError::UnknownCourse(slug.to_string()))?;
        self.course = Some(entry.slug.to_string());
        self.problem = None;
        self.phase = Phase::CourseSelected;
        tracing::info!(course = entry.slug, "course selected");
        self.manifests
            .load(&self.assets, &self.config.manifest_dir, entry.slug)
            .await?;
        self.next_problem().await
    }

    pub async fn select_random_course(&mut self) -> Result<&Problem<E::Layout>, SessionError> {
        let slug = random_course(&mut self.rng).slug;
        self.select_course(slug).await
    }

    pub async fn next_problem(&mut self) -> Result<&Problem<E::Layout>, SessionError> {
        let course = self.course.clone().ok_or(SessionError::NoCourse)?;
        let files = match self
            .manifests
            .load(&self.assets, &self.config.manifest_dir, &course)
            .await
        {
            Ok(files) => files,
            Err(err) => {
                tracing::error!(course = %course, %err, "manifest fetch failed");
                self.phase = Phase::CourseSelected;
                return Err(err.into());
            }
        };
        if files.is_empty() {
            self.phase = Phase::CourseSelected;
            return Err(SessionError::EmptyCourse { course });
        }
        let file = files[self.rng.random_range(0..files.len())].clone();
        let path = illustration_path(&self.config.illustration_dir, &course, &file);
        self.load_problem(&path).await
    }

    pub async fn load_problem(&mut self, path: &str) -> Result<&Problem<E::Layout>, SessionError> {
        self.phase = Phase::ProblemLoading;
        self.problem = None;
        match self.fetch_problem(path).await {
            Ok(problem) => {
                self.phase = Phase::ProblemReady;
                Ok(&*self.problem.insert(problem))
            }
            Err(err) => {
                tracing::error!(path, %err, "problem load failed");
                self.phase = if self.course.is_some() {
                    Phase::CourseSelected
                } else {
                    Phase::Idle
                };
                Err(err)
            }
        }
    }

    async fn fetch_problem(&mut self, path: &str) -> Result<Problem<E::Layout>, SessionError> {
        let text = self.assets.fetch_text(path).await?;
        let problem = build_problem(&self.engine, &self.config, &mut self.rng, path, &text).await?;
        Ok(problem)
    }

    pub async fn activate(&mut self, target: NodeId, point: Point) -> Result<Feedback, SessionError> {
        self.handle(PuzzleEvent::PieceActivated { target, point }).await
    }

    pub async fn select_swatch(&mut self, index: usize) -> Result<Feedback, SessionError> {
        self.handle(PuzzleEvent::SwatchSelected { index }).await
    }

    pub async fn handle(&mut self, event: PuzzleEvent) -> Result<Feedback, SessionError> {
        let problem = self.problem.as_mut().ok_or(SessionError::NoProblem)?;
        self.phase = Phase::Interacting;
        let outcome = problem.board.handle(
            &mut problem.working,
            &mut problem.palette,
            problem.layout.as_ref(),
            event,
        );
        let mut feedback = Feedback {
            outcome,
            score: None,
            cue: None,
        };
        if let EventOutcome::Painted { piece, .. } = &feedback.outcome {
            match &problem.reference_pixels {
                Some(reference) => match self.engine.rasterize(&problem.working, self.config.raster).await {
                    Ok(pixels) => {
                        let score = match_score(reference, &pixels);
                        let cue = problem.scores.record(score);
                        tracing::debug!(piece = piece.index(), score, best = problem.scores.best(), "scored");
                        self.audio.play(cue.sound_name(), self.config.volume);
                        feedback.score = Some(score);
                        feedback.cue = Some(cue);
                    }
                    Err(err) => tracing::warn!(%err, "working copy raster failed"),
                },
                None => tracing::debug!("problem has no reference raster, move not scored"),
            }
        }
        self.phase = Phase::ProblemReady;
        Ok(feedback)
    }
}
