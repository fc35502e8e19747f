//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Credential lookup: a non-empty environment variable `env` wins over the
    /// file value. Blank values count as absent.
    fn get_secret(&self, section: &str, key: &str, env: &str) -> Option<String> {
        std::env::var(env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.get_string(section, key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
