use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use terrain_hydrology::config::SimulationConfig;
use terrain_hydrology::erosion::{
    hydraulic_erode, thermal_erode_gpu_or_cpu, CpuThermalErosion, ErosionEngine,
};
use terrain_hydrology::export;
use terrain_hydrology::hydrology::{
    self, carve_channels, compute_moisture, FillOptions, WaterKind,
};
use terrain_hydrology::seeds::StageSeeds;
use terrain_hydrology::tilemap::Tilemap;

#[derive(Parser, Debug)]
#[command(name = "terrain_hydrology")]
#[command(about = "Generate terrain with hydrology and erosion simulation")]
struct Args {
    /// Width of the tilemap in pixels
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Height of the tilemap in pixels
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the derived flow-routing seed
    #[arg(long)]
    routing_seed: Option<u64>,

    /// Override the derived rainfall seed
    #[arg(long)]
    rainfall_seed: Option<u64>,

    /// Optional JSON config file (missing/invalid falls back to defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for exported PNGs
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Run hydraulic (virtual pipes) erosion before the hydrology solve
    #[arg(long)]
    hydraulic: bool,

    /// Run thermal (talus) erosion before the hydrology solve
    #[arg(long)]
    thermal: bool,

    /// Prefer the GPU for thermal erosion when available
    #[arg(long)]
    gpu: bool,

    /// Channel carve depth (0 disables carving)
    #[arg(long, default_value = "0.05")]
    carve_depth: f32,
}

fn synthesize_terrain(width: usize, height: usize, cfg: &SimulationConfig, seed: u64) -> Tilemap<f32> {
    let fbm = Fbm::<Perlin>::new(seed as u32)
        .set_octaves(cfg.terrain.noise_octaves)
        .set_frequency(cfg.terrain.noise_frequency);

    let mut map = Tilemap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = fbm.get([x as f64, y as f64]) as f32;
            map.set(x, y, cfg.terrain.base_height + v);
        }
    }
    map
}

fn main() {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => SimulationConfig::load_from_file(path),
        None => SimulationConfig::default(),
    };
    if let Some(w) = args.width {
        cfg.terrain.width = w;
    }
    if let Some(h) = args.height {
        cfg.terrain.height = h;
    }
    if let Some(s) = args.seed {
        cfg.terrain.seed = s;
    }

    let mut seeds = StageSeeds::from_master(cfg.terrain.seed);
    if let Some(s) = args.routing_seed {
        seeds = seeds.with_routing(s);
    }
    if let Some(s) = args.rainfall_seed {
        seeds = seeds.with_rainfall(s);
    }
    println!(
        "Generating {}x{} terrain (seed {})",
        cfg.terrain.width, cfg.terrain.height, seeds.master
    );

    let start = Instant::now();
    let mut height = synthesize_terrain(cfg.terrain.width, cfg.terrain.height, &cfg, seeds.terrain);
    println!("  terrain synthesis: {:.2?}", start.elapsed());

    if args.hydraulic {
        let t = Instant::now();
        let mut p = cfg.hydraulic;
        p.seed = seeds.rainfall;
        let stats = hydraulic_erode(&mut height, &p);
        stats.print_summary("Hydraulic erosion");
        println!("  hydraulic erosion: {:.2?}", t.elapsed());
    }

    if args.thermal {
        let t = Instant::now();
        let ok = if args.gpu {
            thermal_erode_gpu_or_cpu(&mut height, &cfg.thermal)
        } else {
            CpuThermalErosion.thermal_erode(&mut height, &cfg.thermal)
        };
        if !ok {
            println!("Thermal erosion pass failed");
        }
        println!("  thermal erosion: {:.2?}", t.elapsed());
    }

    let t = Instant::now();
    let filled = hydrology::fill_depressions(&height, &FillOptions::default());
    let mut settings = cfg.hydrology.clone();
    settings.seed = seeds.routing as u32;
    let hydro = hydrology::generate_hydrology(&filled, &settings);
    println!("  hydrology solve: {:.2?}", t.elapsed());

    let n = hydro.flow_dir.len().max(1);
    let sea = hydro.water.iter().filter(|&&k| k == WaterKind::Sea).count();
    let rivers = hydro.water.iter().filter(|&&k| k == WaterKind::River).count();
    let lakes = hydro.water.iter().filter(|&&k| k == WaterKind::Lake).count();
    println!(
        "  sea level {:.3}: {:.1}% sea, {} river tiles, {} lake tiles",
        hydro.sea_level,
        100.0 * sea as f32 / n as f32,
        rivers,
        lakes
    );

    let moisture = compute_moisture(
        hydro.width,
        hydro.height,
        &hydro.water,
        settings.moisture_falloff,
        settings.include_sea_in_moisture,
        settings.moisture_use_8_way,
    );

    let mut carved = filled.clone();
    carve_channels(&mut carved, &hydro, args.carve_depth, 0.25);

    if let Err(err) = std::fs::create_dir_all(&args.output_dir) {
        println!("Could not create {}: {err}", args.output_dir.display());
        return;
    }
    let out = |name: &str| args.output_dir.join(name);

    let results = [
        (
            "height.png",
            export::export_heightmap(&carved, hydro.sea_level, out("height.png")),
        ),
        (
            "water.png",
            export::export_water_map(&carved, &hydro, out("water.png")),
        ),
        (
            "moisture.png",
            export::export_moisture_map(&moisture, hydro.width, hydro.height, out("moisture.png")),
        ),
    ];
    for (name, result) in results {
        match result {
            Ok(()) => println!("  Saved map: {}", args.output_dir.join(name).display()),
            Err(err) => println!("  Failed to save {name}: {err}"),
        }
    }

    println!("Done in {:.2?}", start.elapsed());
}
