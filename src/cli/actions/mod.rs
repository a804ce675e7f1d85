pub mod run;

#[derive(Debug)]
pub enum Action {
    Run {
        dsn: String,
        provider_url: String,
        post_auth_path: String,
    },
}
