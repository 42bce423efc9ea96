use cached::proc_macro::cached;
use config::{Config, File, FileFormat};
use futures_locks::RwLock;
use once_cell::sync::Lazy;
use serde::Deserialize;

static CONFIG_BUILDER: Lazy<RwLock<Config>> = Lazy::new(|| {
    RwLock::new({
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("../Quad.toml"),
            FileFormat::Toml,
        ));

        if std::path::Path::new("Quad.toml").exists() {
            builder = builder.add_source(File::new("Quad.toml", FileFormat::Toml));
        }

        builder.build().unwrap()
    })
});

#[derive(Deserialize, Debug, Clone)]
pub struct Database {
    pub mongodb: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Notifications {
    /// Whether notifications where the actor is also the recipient
    /// are silently dropped
    pub suppress_self: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeaturesLimits {
    pub discover_results: usize,
    pub feed_posts: usize,
    pub trending_posts: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeaturesLimitsCollection {
    pub default: FeaturesLimits,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeaturesTrending {
    /// Hours it takes for a post's trending score to halve
    pub half_life_hours: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Features {
    pub limits: FeaturesLimitsCollection,
    pub trending: FeaturesTrending,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub database: Database,
    pub notifications: Notifications,
    pub features: Features,
}

pub async fn init() {
    println!(
        ":: Quad Configuration ::\n\x1b[32m{:?}\x1b[0m",
        config().await
    );
}

pub async fn read() -> Config {
    CONFIG_BUILDER.read().await.clone()
}

#[cached(time = 30)]
pub async fn config() -> Settings {
    read().await.try_deserialize::<Settings>().unwrap()
}

#[cfg(test)]
mod tests {
    use crate::config;

    #[async_std::test]
    async fn it_loads_defaults() {
        let settings = config().await;
        assert_eq!(settings.features.limits.default.discover_results, 50);
        assert_eq!(settings.features.trending.half_life_hours, 24);
        assert!(settings.notifications.suppress_self);
    }
}
