use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("movie.html", include_str!("../templates/movie.html")),
];

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(TEMPLATES.iter().copied()) {
            tracing::error!("Failed to load templates: {}", e);
        }
        tera
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_parse() {
        let names: Vec<_> = get_tera().get_template_names().collect();
        for (name, _) in TEMPLATES {
            assert!(names.contains(name), "{name} missing from {names:?}");
        }
    }
}
