//! Periodic Conway's Game of Life distributed over a `tessera` grid.
//!
//! Decomposes a `width x height` torus into contiguous row blocks, one per
//! worker, and drives the standard `tessera` lifecycle each step: analyze
//! boundaries, exchange tile metadata once at startup, then exchange
//! payloads every generation.

mod buffer;
mod cell;

use clap::Parser;
use mpi::topology::Communicator;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tessera::{Node, FIRST_USER_TAG};
use tracing::info;

use cell::LifeCell;

/// Toroidal Game of Life over a distributed tile grid.
#[derive(Parser, Debug)]
#[command(name = "life", about = "Distributed Conway's Game of Life")]
struct Args {
    /// Grid width.
    #[arg(long, default_value_t = 16)]
    width: u64,

    /// Grid height.
    #[arg(long, default_value_t = 16)]
    height: u64,

    /// Number of generations to simulate.
    #[arg(long, default_value_t = 10)]
    steps: u64,

    /// RNG seed for the initial random fill.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Fraction of cells alive in the initial fill, in `[0, 1]`.
    #[arg(long, default_value_t = 0.3)]
    density: f64,
}

/// Row block owned by `rank` out of `world_size` workers splitting `height`
/// rows as evenly as possible.
fn row_block(height: u64, world_size: i32, rank: i32) -> (u64, u64) {
    let world_size = world_size as u64;
    let rank = rank as u64;
    let base = height / world_size;
    let extra = height % world_size;
    let start = rank * base + rank.min(extra);
    let len = base + if rank < extra { 1 } else { 0 };
    (start, start + len)
}

fn wrap(i: i64, len: u64) -> u64 {
    let len = len as i64;
    (((i % len) + len) % len) as u64
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let universe = mpi::initialize().expect("MPI failed to initialize");
    let world = universe.world();
    let rank = world.rank();
    let size = world.size();

    let mut node: Node<_, 2, LifeCell> =
        Node::new(&world, [args.width, args.height]).expect("invalid grid dimensions");

    let (row_start, row_end) = row_block(args.height, size, rank);
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(rank as u64));
    for y in row_start..row_end {
        for x in 0..args.width {
            let alive = rng.gen_bool(args.density.clamp(0.0, 1.0));
            node.add_tile([x, y], LifeCell::new(alive))
                .expect("tile indices are always in range for this grid");
        }
    }

    node.bcast_ownership().expect("ownership broadcast failed");
    node.analyze_boundaries().expect("boundary analysis failed");
    node.send_tiles().expect("tile metadata send failed");
    node.recv_tiles().expect("tile metadata receive failed");

    info!(
        rank,
        local_tiles = node.local_ids(false).len(),
        boundary_tiles = node.boundary_ids(false).len(),
        "node initialized"
    );

    let step_tag = FIRST_USER_TAG;
    let offsets: [i64; 3] = [-1, 0, 1];

    for step in 0..args.steps {
        node.send_payload(step_tag).expect("payload send failed");
        node.recv_payload(step_tag).expect("payload receive failed");
        node.wait_payload(step_tag).expect("payload wait failed");

        for y in row_start..row_end {
            for x in 0..args.width {
                let cid = node.cid_of([x, y]).expect("in-range tile index");
                let mut alive_neighbors = 0usize;
                for &dx in &offsets {
                    for &dy in &offsets {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = wrap(x as i64 + dx, args.width);
                        let ny = wrap(y as i64 + dy, args.height);
                        let neighbor_cid = node.cid_of([nx, ny]).expect("in-range tile index");
                        if node.get(neighbor_cid).expect("every neighbor is registered").payload.is_alive() {
                            alive_neighbors += 1;
                        }
                    }
                }
                node.get_mut(cid)
                    .expect("tile registered above")
                    .payload
                    .stage_next(alive_neighbors);
            }
        }

        for cid in node.local_ids(false) {
            node.get_mut(cid).expect("local id came from the registry").payload.advance();
        }

        info!(step, rank, "generation advanced");
    }
}
