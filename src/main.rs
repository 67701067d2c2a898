mod app;
mod audio;
mod fetch;
mod view;

fn main() {
    app::run();
}
