//! Feeds seeded random frames into a spatial pooling layer and prints how many minicolumns
//! win each timestep, followed by the activity map of the last one.
//!
//! Run with `RUST_LOG=htm_layer=debug` to see the inhibition radius of every timestep.

use anyhow::Result;
use htm_layer::{ColumnConfig, Htm, HtmConfig, LayerConfig, NoiseCodec};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = HtmConfig {
        layer: LayerConfig {
            height: 32,
            width: 32,
        },
        columns: ColumnConfig {
            receptive_field: 0.02,
            local_activity: 0.1,
            column_complexity: 0.2,
        },
        workers: 4,
    };

    let codec = NoiseCodec::new(96, 96, 0.3, 42);
    let mut htm = Htm::new(config, codec)?;

    for _ in 0..20 {
        htm.process()?;
        let active = htm.active_columns(0).len();
        println!(
            "timestep {:>3}: {:>4} of {} minicolumns active, inhibition radius {}",
            htm.timestep(),
            active,
            htm.layer().minicolumns().len(),
            htm.layer().inhibition_radius()
        );
    }

    let layer = htm.layer();
    for y in 0..layer.height() {
        let row: String = (0..layer.width())
            .map(|x| if layer.active_at(x, y, 0) { '#' } else { '.' })
            .collect();
        println!("{row}");
    }

    Ok(())
}
