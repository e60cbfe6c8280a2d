// A small example runner for the `pixel_analyzer` library: decode an image
// from a path argument, run the full pipeline, and print what it derived.

use pixel_analyzer::pipeline::{
    TOTAL_AVERAGE_DELTA, TOTAL_LARGEST_OBJECT, TOTAL_LARGEST_OBJECT_SIZE,
};
use pixel_analyzer::AnalysisPipeline;

fn main() {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: pixel_analyzer <image-path>");
        std::process::exit(2);
    };

    let source = match image::open(&path) {
        Ok(decoded) => decoded,
        Err(error) => {
            eprintln!("could not decode {path}: {error}");
            std::process::exit(1);
        }
    };

    let mut pipeline = match AnalysisPipeline::new(Box::new(source)) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            eprintln!("could not analyze {path}: {error}");
            std::process::exit(1);
        }
    };

    println!(
        "{path}: {}x{} ({} pixels)",
        pipeline.width(),
        pipeline.height(),
        pipeline.total_pixels()
    );

    println!("distinct colors: {}", pipeline.get_colors().len());

    match pipeline.get_total(TOTAL_AVERAGE_DELTA) {
        Ok(average_delta) => println!(
            "average local delta: {:.3} (sd {:.3})",
            average_delta.value, average_delta.standard_deviation
        ),
        Err(error) => eprintln!("{error}"),
    }

    let edge_mask = match pipeline.get_edge_mask() {
        Ok(mask) => mask.clone(),
        Err(error) => {
            eprintln!("edge detection failed: {error}");
            std::process::exit(1);
        }
    };
    let flagged = edge_mask.iter().filter(|&&flag| flag == 1).count();
    println!("edge pixels: {flagged}");

    pipeline.get_object_mask(edge_mask);
    println!("objects: {}", pipeline.get_objects().len());

    if let (Ok(id), Ok(size)) = (
        pipeline.get_total(TOTAL_LARGEST_OBJECT),
        pipeline.get_total(TOTAL_LARGEST_OBJECT_SIZE),
    ) {
        println!("largest object: label {} ({} pixels)", id.value, size.value);
    }

    for (label, distance) in pipeline.get_sorted_objects() {
        println!("  object {label}: distance {distance}");
    }
}
