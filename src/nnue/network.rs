//! NNUE network weights and the on-disk layout that loads them.
//!
//! Architecture: HalfKP input transform (41 024 features per perspective
//! into a 256-wide half-accumulator) feeding three affine layers
//! (512 -> 32 -> 32 -> 1) with clipped-ReLU activations between them.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::NnueError;

pub const INPUT_DIMENSIONS: usize = 41_024;
pub const HALF_DIMENSIONS: usize = 256;
pub const OUTPUT_DIMENSIONS: usize = 2 * HALF_DIMENSIONS;
pub const WEIGHT_SCALE_BITS: u32 = 6;

const INPUT_TRANSFORM_HASH: u32 = 0x5d69_d5b8 ^ OUTPUT_DIMENSIONS as u32;
const NETWORK_HASH: u32 = 0x6333_7156;
const FILE_HASH: u32 = INPUT_TRANSFORM_HASH ^ NETWORK_HASH;
const FILE_VERSION: u32 = 0x7af3_2f16;

const LAYER_SIZES: [(usize, usize); 3] = [(OUTPUT_DIMENSIONS, 32), (32, 32), (32, 1)];

/// Feature transformer: a 256-wide bias and a `[HALF_DIMENSIONS][INPUT_DIMENSIONS]`
/// weight matrix, stored row-major by half-dimension as the file format lays
/// it out.
pub struct InputTransform {
    pub bias: Vec<i16>,
    pub weights: Vec<i16>,
}

impl InputTransform {
    #[must_use]
    fn zero() -> Self {
        InputTransform {
            bias: vec![0; HALF_DIMENSIONS],
            weights: vec![0; HALF_DIMENSIONS * INPUT_DIMENSIONS],
        }
    }

    #[inline]
    #[must_use]
    fn weight(&self, half_dim: usize, feature: usize) -> i16 {
        self.weights[half_dim * INPUT_DIMENSIONS + feature]
    }
}

/// `y = weights * x + bias`, weights stored row-major `[out][in]` as int8.
pub struct AffineLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub weights: Vec<i8>,
    pub bias: Vec<i32>,
}

impl AffineLayer {
    fn zero(in_dim: usize, out_dim: usize) -> Self {
        AffineLayer { in_dim, out_dim, weights: vec![0; in_dim * out_dim], bias: vec![0; out_dim] }
    }

    fn forward(&self, input: &[u8]) -> Vec<i32> {
        let mut output = self.bias.clone();
        for o in 0..self.out_dim {
            let row = &self.weights[o * self.in_dim..(o + 1) * self.in_dim];
            let mut sum = 0i32;
            for (w, &x) in row.iter().zip(input) {
                sum += i32::from(*w) * i32::from(x);
            }
            output[o] += sum;
        }
        output
    }
}

/// The three affine layers beyond the input transform.
pub struct Network {
    pub layers: [AffineLayer; 3],
}

impl Network {
    fn zero() -> Self {
        Network {
            layers: [
                AffineLayer::zero(LAYER_SIZES[0].0, LAYER_SIZES[0].1),
                AffineLayer::zero(LAYER_SIZES[1].0, LAYER_SIZES[1].1),
                AffineLayer::zero(LAYER_SIZES[2].0, LAYER_SIZES[2].1),
            ],
        }
    }
}

/// Clamp pre-activations into `[0, 127]` after a `>> WEIGHT_SCALE_BITS` shift,
/// the clipped-ReLU used between affine layers.
fn clipped_relu(values: &[i32]) -> Vec<u8> {
    values.iter().map(|&v| ((v >> WEIGHT_SCALE_BITS).clamp(0, 127)) as u8).collect()
}

/// A loaded NNUE network: the feature transformer plus the evaluation head.
pub struct NnueNetwork {
    pub name: String,
    pub input: InputTransform,
    pub network: Network,
}

impl NnueNetwork {
    /// A network with all weights zeroed. Used as the built-in default so
    /// the engine never has to touch the filesystem to produce a score;
    /// real deployments load a trained file with [`NnueNetwork::load`].
    #[must_use]
    pub fn zero() -> Self {
        NnueNetwork { name: String::from("zero"), input: InputTransform::zero(), network: Network::zero() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NnueError> {
        let file = File::open(path).map_err(|e| NnueError::Io { message: e.to_string() })?;
        let mut reader = BufReader::new(file);
        Self::from_reader(&mut reader)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, NnueError> {
        let mut reader = std::io::Cursor::new(data);
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, NnueError> {
        let version = read_u32(reader)?;
        if version != FILE_VERSION {
            return Err(NnueError::WrongVersion { found: version });
        }
        let hash = read_u32(reader)?;
        if hash != FILE_HASH {
            return Err(NnueError::WrongHash { found: hash, expected: FILE_HASH });
        }

        let name_len = read_u32(reader)? as usize;
        let mut name_bytes = vec![0u8; name_len];
        reader.read_exact(&mut name_bytes).map_err(io_err)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let mut bias = vec![0i16; HALF_DIMENSIONS];
        read_i16_slice(reader, &mut bias)?;

        let mut weights = vec![0i16; HALF_DIMENSIONS * INPUT_DIMENSIONS];
        read_i16_slice(reader, &mut weights)?;
        let input = InputTransform { bias, weights };

        let mut layers = Vec::with_capacity(3);
        for &(in_dim, out_dim) in &LAYER_SIZES {
            let mut layer_bias = vec![0i32; out_dim];
            read_i32_slice(reader, &mut layer_bias)?;
            let mut layer_weights = vec![0i8; in_dim * out_dim];
            read_i8_slice(reader, &mut layer_weights)?;
            layers.push(AffineLayer { in_dim, out_dim, weights: layer_weights, bias: layer_bias });
        }
        let layers: [AffineLayer; 3] =
            layers.try_into().unwrap_or_else(|_| unreachable!("exactly three layer sizes"));

        Ok(NnueNetwork { name, input, network: Network { layers } })
    }

    /// Run the 512-wide perspective-selected input through the three affine
    /// layers, returning the raw int32 output before centipawn scaling.
    #[must_use]
    pub fn forward(&self, perspective_input: &[i16; OUTPUT_DIMENSIONS]) -> i32 {
        let clipped = clipped_relu(&perspective_input.iter().map(|&v| i32::from(v)).collect::<Vec<_>>());
        let hidden1 = clipped_relu(&self.network.layers[0].forward(&clipped));
        let hidden2 = clipped_relu(&self.network.layers[1].forward(&hidden1));
        self.network.layers[2].forward(&hidden2)[0]
    }

    #[inline]
    #[must_use]
    pub(crate) fn half_weight(&self, half_dim: usize, feature: usize) -> i16 {
        self.input.weight(half_dim, feature)
    }
}

fn io_err(e: std::io::Error) -> NnueError {
    NnueError::Io { message: e.to_string() }
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, NnueError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(io_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i16_slice<R: Read>(reader: &mut R, out: &mut [i16]) -> Result<(), NnueError> {
    for slot in out.iter_mut() {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).map_err(io_err)?;
        *slot = i16::from_le_bytes(buf);
    }
    Ok(())
}

fn read_i32_slice<R: Read>(reader: &mut R, out: &mut [i32]) -> Result<(), NnueError> {
    for slot in out.iter_mut() {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).map_err(io_err)?;
        *slot = i32::from_le_bytes(buf);
    }
    Ok(())
}

fn read_i8_slice<R: Read>(reader: &mut R, out: &mut [i8]) -> Result<(), NnueError> {
    for slot in out.iter_mut() {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf).map_err(io_err)?;
        *slot = buf[0] as i8;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_network_has_expected_shapes() {
        let net = NnueNetwork::zero();
        assert_eq!(net.input.bias.len(), HALF_DIMENSIONS);
        assert_eq!(net.input.weights.len(), HALF_DIMENSIONS * INPUT_DIMENSIONS);
        assert_eq!(net.network.layers[0].in_dim, OUTPUT_DIMENSIONS);
        assert_eq!(net.network.layers[2].out_dim, 1);
    }

    #[test]
    fn zero_network_evaluates_to_zero() {
        let net = NnueNetwork::zero();
        let input = [0i16; OUTPUT_DIMENSIONS];
        assert_eq!(net.forward(&input), 0);
    }

    #[test]
    fn wrong_version_word_is_rejected() {
        let mut bytes = vec![0xffu8; 4];
        bytes.extend_from_slice(&FILE_HASH.to_le_bytes());
        assert!(matches!(NnueNetwork::from_bytes(&bytes), Err(NnueError::WrongVersion { .. })));
    }
}
