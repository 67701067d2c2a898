use rand::Rng;

#[derive(Clone, Copy, Debug)]
pub struct CourseCatalogEntry {
    pub label: &'static str,
    pub slug: &'static str,
    pub attribution: &'static str,
}

pub const DEFAULT_COURSE_SLUG: &str = "noto-emoji";

pub const COURSE_CATALOG: &[CourseCatalogEntry] = &[
    CourseCatalogEntry {
        label: "Noto Emoji",
        slug: DEFAULT_COURSE_SLUG,
        attribution: "Noto Emoji by Google, Apache License 2.0",
    },
    CourseCatalogEntry {
        label: "Twemoji",
        slug: "twemoji",
        attribution: "Twemoji by Twitter, CC BY 4.0",
    },
    CourseCatalogEntry {
        label: "Fluent UI Emoji",
        slug: "fluentui-emoji-flat",
        attribution: "Fluent UI Emoji by Microsoft, MIT License",
    },
    CourseCatalogEntry {
        label: "Blobmoji",
        slug: "blobmoji",
        attribution: "Blobmoji by C1710, Apache License 2.0",
    },
    CourseCatalogEntry {
        label: "Emojitwo",
        slug: "emojitwo",
        attribution: "Emojitwo by the Emojitwo contributors, CC BY 4.0",
    },
];

pub fn course_by_slug(slug: &str) -> Option<&'static CourseCatalogEntry> {
    let trimmed = slug.trim();
    COURSE_CATALOG
        .iter()
        .find(|entry| entry.slug.eq_ignore_ascii_case(trimmed))
}

pub fn course_by_label(label: &str) -> Option<&'static CourseCatalogEntry> {
    let trimmed = label.trim();
    COURSE_CATALOG
        .iter()
        .find(|entry| entry.label.eq_ignore_ascii_case(trimmed))
}

pub fn random_course<R: Rng + ?Sized>(rng: &mut R) -> &'static CourseCatalogEntry {
    &COURSE_CATALOG[rng.random_range(0..COURSE_CATALOG.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn lookup_ignores_case_and_padding() {
        let entry = course_by_slug(" TWEMOJI ").expect("twemoji");
        assert_eq!(entry.slug, "twemoji");
        assert_eq!(course_by_label("blobmoji").map(|e| e.slug), Some("blobmoji"));
        assert!(course_by_slug("openmoji").is_none());
    }

    #[test]
    fn random_course_comes_from_catalog() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let entry = random_course(&mut rng);
            assert!(course_by_slug(entry.slug).is_some());
        }
    }
}
