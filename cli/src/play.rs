use super::*;

use nurie_core::catalog::COURSE_CATALOG;
use nurie_core::{
    AssetError, AssetSource, AudioBackend, AudioError, EventOutcome, Feedback, NodeId, Point,
    Session, SessionError,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(clap::Args)]
pub(super) struct PlayArgs {
    /// Directory holding `data/` manifests, `svg/` illustrations and `mp3/`.
    #[arg(long, env = "NURIE_ROOT", default_value = ".")]
    root: PathBuf,
    #[arg(long)]
    course: Option<String>,
    /// Play a single illustration, relative to the root.
    #[arg(long, conflicts_with = "course")]
    file: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
}

struct FsAssets {
    root: PathBuf,
}

impl AssetSource for FsAssets {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    path: path.to_string(),
                }
            } else {
                AssetError::Fetch {
                    path: path.to_string(),
                    reason: err.to_string(),
                }
            }
        })
    }
}

/// Announces cues on stdout instead of playing them.
struct TerminalAudio {
    root: PathBuf,
}

impl AudioBackend for TerminalAudio {
    type Buffer = String;

    async fn decode(&self, url: &str) -> Result<String, AudioError> {
        match tokio::fs::metadata(self.root.join(url)).await {
            Ok(_) => Ok(url.to_string()),
            Err(err) => Err(AudioError::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn start(&self, buffer: &String, volume: f32) -> Result<(), AudioError> {
        println!("[sound {buffer} @ {volume:.2}]");
        Ok(())
    }
}

type TerminalSession = Session<FsAssets, ResvgBackend, TerminalAudio, StdRng>;

const HELP: &str = "commands: show | swatch N | paint N | click X Y | next | save PATH | quit";

pub(super) async fn run(
    args: PlayArgs,
    config: PuzzleConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let PlayArgs {
        root,
        course,
        file,
        seed,
    } = args;
    let mut session: TerminalSession = Session::new(
        config,
        FsAssets { root: root.clone() },
        ResvgBackend::new(),
        TerminalAudio { root },
        seeded(seed),
    );

    let loaded = match (&file, &course) {
        (Some(file), _) => session.load_problem(file).await.map(|_| ()),
        (None, Some(course)) => session.select_course(course).await.map(|_| ()),
        (None, None) => session.select_random_course().await.map(|_| ()),
    };
    if let Err(err) = loaded {
        report_load_error(&err);
    }
    if let Some(course) = session.course() {
        println!("course: {course}");
    }
    show(&session);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        session.user_input().await;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["show"] => show(&session),
            ["next"] => {
                let result = match &file {
                    Some(file) => session.load_problem(file).await.map(|_| ()),
                    None => session.next_problem().await.map(|_| ()),
                };
                match result {
                    Ok(()) => show(&session),
                    Err(err) => report_load_error(&err),
                }
            }
            ["swatch", index] => match index.parse::<usize>() {
                Ok(index) => report(session.select_swatch(index).await),
                Err(_) => println!("swatch needs an index"),
            },
            ["paint", index] => match index.parse::<usize>() {
                Ok(index) => match piece_center(&session, index) {
                    Some((node, point)) => report(session.activate(node, point).await),
                    None => println!("no piece {index}"),
                },
                Err(_) => println!("paint needs a piece index"),
            },
            ["click", x, y] => match (x.parse::<f64>(), y.parse::<f64>()) {
                (Ok(x), Ok(y)) => {
                    let point = Point::new(x, y);
                    match topmost_at(&session, point) {
                        Some(target) => report(session.activate(target, point).await),
                        None => println!("nothing at {x},{y}"),
                    }
                }
                _ => println!("click needs two coordinates"),
            },
            ["save", path] => match session.problem() {
                Some(problem) => {
                    let markup = problem.working().to_svg_string();
                    match tokio::fs::write(path, markup).await {
                        Ok(()) => println!("saved {path}"),
                        Err(err) => println!("save failed: {err}"),
                    }
                }
                None => println!("no problem loaded"),
            },
            _ => println!("{HELP}"),
        }
    }
    Ok(())
}

fn report_load_error(err: &SessionError) {
    println!("load failed: {err}");
    if let SessionError::UnknownCourse(_) = err {
        println!("available courses:");
        for entry in COURSE_CATALOG {
            println!("  {} ({})", entry.slug, entry.label);
        }
    }
}

fn report(result: Result<Feedback, SessionError>) {
    match result {
        Ok(feedback) => {
            match feedback.outcome {
                EventOutcome::Painted { piece, color } => {
                    println!("painted node {} {color}", piece.index())
                }
                EventOutcome::SwatchChanged { previous, current } => {
                    println!("swatch {previous} -> {current}")
                }
                EventOutcome::Ignored => println!("ignored"),
            }
            if let Some(score) = feedback.score {
                println!("score: {score}");
            }
        }
        Err(err) => println!("{err}"),
    }
}

fn show(session: &TerminalSession) {
    let Some(problem) = session.problem() else {
        println!("no problem loaded");
        return;
    };
    let doc = problem.working();
    println!("problem: {}", problem.path());
    for (idx, piece) in problem.board().pieces().iter().enumerate() {
        let tag = doc.tag(piece.node).unwrap_or("?");
        let painted = doc
            .attr(piece.node, "style")
            .is_none_or(|style| !style.contains("fill:"));
        let state = if painted { "painted" } else { "blank" };
        println!("  piece {idx}: <{tag}> {state}");
    }
    let palette = problem.palette();
    let swatches: Vec<String> = palette
        .colors()
        .iter()
        .enumerate()
        .map(|(idx, color)| {
            if idx == palette.selected() {
                format!("[{idx}:{color}]")
            } else {
                format!("{idx}:{color}")
            }
        })
        .collect();
    println!("palette: {}", swatches.join(" "));
    let scores = problem.scores();
    println!("score: {} (best {})", scores.latest(), scores.best());
    if !problem.is_scoreable() {
        println!("scoring unavailable for this illustration");
    }
}

fn piece_center(session: &TerminalSession, index: usize) -> Option<(NodeId, Point)> {
    let problem = session.problem()?;
    let node = problem.board().pieces().get(index)?.node;
    let rect = problem.layout()?.bounding_box(node)?;
    Some((
        node,
        Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0),
    ))
}

fn topmost_at(session: &TerminalSession, point: Point) -> Option<NodeId> {
    let problem = session.problem()?;
    problem.layout()?.elements_at(point).into_iter().next()
}
