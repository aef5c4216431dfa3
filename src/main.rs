// Thin delegating binary.
//
// The demo server assembly lives in the `oauth2-actix` crate.
#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    oauth2_actix::run().await
}
