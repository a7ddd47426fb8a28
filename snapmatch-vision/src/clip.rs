use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ndarray::{Array2, Array4};
use ort::{session::Session, value::Value};

/// CLIP ViT-B/32 visual input resolution
const INPUT_SIZE: u32 = 224;

/// Per-channel normalization constants from the CLIP preprocessing pipeline
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Image embedding (CLIP visual encoder output), L2-normalized
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Array2<f32>,
}

/// Build the encoder input tensor from an image.
///
/// Reproduces the CLIP preprocessing: resize so the short side is 224
/// (bicubic), center-crop to 224x224, then scale to [0, 1] and normalize
/// each RGB channel with the model's mean/std. Output layout is NCHW.
pub fn preprocess(img: &DynamicImage) -> Result<Array4<f32>> {
    let (width, height) = img.dimensions();

    let scale = INPUT_SIZE as f32 / width.min(height) as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(INPUT_SIZE);
    let new_height = ((height as f32 * scale).round() as u32).max(INPUT_SIZE);

    let resized = img.resize_exact(new_width, new_height, image::imageops::FilterType::CatmullRom);

    // Center crop to the square input window
    let left = (new_width - INPUT_SIZE) / 2;
    let top = (new_height - INPUT_SIZE) / 2;
    let cropped = resized
        .crop_imm(left, top, INPUT_SIZE, INPUT_SIZE)
        .to_rgb8();

    // Split into channel planes for cache-friendly layout
    let pixel_count = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut input_data = vec![0.0_f32; 3 * pixel_count];
    let (r_plane, rest) = input_data.split_at_mut(pixel_count);
    let (g_plane, b_plane) = rest.split_at_mut(pixel_count);

    let pixels = cropped.as_raw();
    for i in 0..pixel_count {
        let idx = i * 3;
        r_plane[i] = (pixels[idx] as f32 / 255.0 - MEAN[0]) / STD[0];
        g_plane[i] = (pixels[idx + 1] as f32 / 255.0 - MEAN[1]) / STD[1];
        b_plane[i] = (pixels[idx + 2] as f32 / 255.0 - MEAN[2]) / STD[2];
    }

    Ok(Array4::from_shape_vec(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        input_data,
    )?)
}

/// Encode an image to a unit-norm embedding
pub fn encode_image(session: &mut Session, img: &DynamicImage) -> Result<Embedding> {
    let input_array = preprocess(img)?;
    let input_tensor = Value::from_array(input_array)?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

    // Expecting shape [1, 512]
    let embedding_size = if shape.len() == 2 {
        shape[1] as usize
    } else {
        data.len()
    };
    let embedding_vec: Vec<f32> = data[0..embedding_size].to_vec();

    // Normalize the embedding (L2 normalization). Mandatory: the matcher's
    // dot product only equals cosine similarity for unit vectors.
    let norm: f32 = embedding_vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    let normalized = if norm > 0.0 {
        embedding_vec.iter().map(|x| x / norm).collect()
    } else {
        embedding_vec
    };

    let embedding_array = Array2::from_shape_vec((1, embedding_size), normalized)?;

    Ok(Embedding {
        vector: embedding_array,
    })
}

/// Compute cosine similarity between two embeddings
pub fn match_embedding(a: &Embedding, b: &Embedding) -> f32 {
    // Embeddings are already L2-normalized, so dot product = cosine similarity
    let a_data = a.vector.as_slice().unwrap();
    let b_data = b.vector.as_slice().unwrap();

    let len = a_data.len().min(b_data.len());

    let dot: f32 = a_data
        .iter()
        .zip(b_data.iter())
        .take(len)
        .map(|(x, y)| x * y)
        .sum();

    dot.max(-1.0).min(1.0)
}
