use std::sync::Arc;

use nurie_core::extract::{AREA_RATIO_DEFAULT, extract_pieces};
use nurie_core::{
    AssetError, AssetSource, AudioBackend, AudioError, Cue, Document, Layout, LayoutEngine,
    Normalizer, Palette, Point, PuzzleConfig, RasterConfig, Session, match_score,
};
use nurie_raster::ResvgBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use resvg::usvg::fontdb;

const FLAG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<rect x="0" y="0" width="100" height="80" fill="#ff0000"/>
<line x1="0" y1="90" x2="100" y2="91" fill="#00ff00" stroke="#00ff00"/>
</svg>"##;

const STACKED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<rect id="base" width="100" height="100" fill="#336699"/>
<circle id="ring" cx="50" cy="50" r="30" fill="none" stroke="#000" stroke-width="4"/>
<path id="tri" d="M0 0 L40 0 L0 40 Z" fill="#ffcc00"/>
</svg>"##;

fn backend() -> ResvgBackend {
    ResvgBackend::with_fontdb(Arc::new(fontdb::Database::new()))
}

struct OneFile(&'static str);

impl AssetSource for OneFile {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        if path == "art.svg" {
            Ok(self.0.to_string())
        } else {
            Err(AssetError::NotFound {
                path: path.to_string(),
            })
        }
    }
}

struct Silent;

impl AudioBackend for Silent {
    type Buffer = ();

    async fn decode(&self, _url: &str) -> Result<(), AudioError> {
        Ok(())
    }

    fn start(&self, _buffer: &(), _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

#[test]
fn reference_scores_full_against_itself() {
    let mut doc = Document::parse(FLAG).expect("parse");
    Normalizer::default().normalize(&mut doc, &mut StdRng::seed_from_u64(1));
    let engine = backend();
    let config = RasterConfig::default();
    let a = engine.render(&doc, config).expect("render");
    let b = engine.render(&doc.clone(), config).expect("render");
    assert_eq!(a.len(), 256 * 256 * 4);
    assert_eq!(match_score(&a, &b), 100);
}

#[test]
fn sliver_is_filtered_by_rendered_area() {
    let mut doc = Document::parse(FLAG).expect("parse");
    let mut rng = StdRng::seed_from_u64(2);
    Normalizer::default().normalize(&mut doc, &mut rng);
    let layout = backend().layout(&doc).expect("layout");
    let canvas = layout.canvas();
    assert_eq!((canvas.width, canvas.height), (100.0, 100.0));
    let extraction = extract_pieces(&mut doc, &layout, AREA_RATIO_DEFAULT);
    assert_eq!(extraction.pieces.len(), 1);
    assert_eq!(doc.tag(extraction.pieces[0]), Some("rect"));
    let palette = Palette::from_pieces(&doc, &extraction.pieces, "black", &mut rng);
    assert_eq!(palette.colors(), ["#ff0000".to_string()]);
    assert_eq!(palette.selected(), 0);
}

#[test]
fn hit_test_follows_painted_geometry() {
    let doc = Document::parse(STACKED).expect("parse");
    let layout = backend().layout(&doc).expect("layout");
    let base = doc.find_by_id("base").expect("base");
    let ring = doc.find_by_id("ring").expect("ring");
    let tri = doc.find_by_id("tri").expect("tri");

    assert_eq!(layout.elements_at(Point::new(5.0, 5.0)), vec![tri, base]);
    // inside the triangle's box but outside its hypotenuse
    assert_eq!(layout.elements_at(Point::new(35.0, 35.0)), vec![base]);
    // unfilled circle only hits on its stroke
    assert_eq!(layout.elements_at(Point::new(50.0, 50.0)), vec![base]);
    assert_eq!(layout.elements_at(Point::new(80.0, 50.0)), vec![ring, base]);
}

#[tokio::test]
async fn painting_the_only_piece_restores_the_reference() {
    let config = PuzzleConfig {
        raster: RasterConfig {
            width: 64,
            height: 64,
        },
        ..PuzzleConfig::default()
    };
    let mut session = Session::new(
        config,
        OneFile(FLAG),
        backend(),
        Silent,
        StdRng::seed_from_u64(3),
    );
    let problem = session.load_problem("art.svg").await.expect("problem");
    assert!(problem.is_scoreable());
    assert_eq!(problem.board().len(), 1);
    let piece = problem.board().pieces()[0].node;

    let feedback = session
        .activate(piece, Point::new(50.0, 40.0))
        .await
        .expect("handled");
    assert_eq!(feedback.score, Some(100));
    assert_eq!(feedback.cue, Some(Cue::Success));
    assert_eq!(session.problem().expect("problem").scores().best(), 100);
}
