use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_template("index.html", include_str!("../templates/index.html")) {
            tracing::error!("Failed to load templates: {}", e);
        }
        tera
    })
}
