mod app;
mod domain;
mod util;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with expense records: [{"name", "amount", "date"}, ...]
    #[arg(long, default_value = "demos/expenses.json")]
    data: String,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1240.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "expense-canvas",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::ExpenseCanvasApp::new(
                cc,
                args.data.clone(),
            )))
        }),
    )
}
