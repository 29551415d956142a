//! CBC (Cipher Block Chaining) mode implementation

use tracing::debug;

use crate::cipher::{BlockCipher, Direction};
use crate::error::{CipherError, Result};
use crate::params::CipherParameters;
use crate::utils;

/// Cipher Block Chaining over any [`BlockCipher`].
///
/// Encryption: `C_i = E(P_i ⊕ C_{i-1})` with `C_0 = IV`.
/// Decryption: `P_i = D(C_i) ⊕ C_{i-1}`.
///
/// The wrapper is itself a `BlockCipher`, so it can be handed to anything that
/// accepts an engine. Its block size is the inner engine's.
pub struct CbcBlockCipher<C: BlockCipher> {
    cipher: C,
    iv: Vec<u8>,
    chain: Vec<u8>,
    direction: Option<Direction>,
}

impl<C: BlockCipher> CbcBlockCipher<C> {
    pub fn new(cipher: C) -> Self {
        let block_size = cipher.block_size();
        Self {
            cipher,
            iv: vec![0u8; block_size],
            chain: vec![0u8; block_size],
            direction: None,
        }
    }

    /// The engine being chained.
    pub fn underlying_cipher(&self) -> &C {
        &self.cipher
    }

    pub fn into_inner(self) -> C {
        self.cipher
    }

    fn encrypt_block(&mut self, input: &[u8], output: &mut [u8], out_off: usize) -> Result<usize> {
        let mut block = input.to_vec();
        utils::xor_in_place(&mut block, &self.chain)?;

        let n = self.cipher.process_block(&block, 0, output, out_off)?;
        self.chain.copy_from_slice(&output[out_off..out_off + n]);
        Ok(n)
    }

    fn decrypt_block(&mut self, input: &[u8], output: &mut [u8], out_off: usize) -> Result<usize> {
        let n = self.cipher.process_block(input, 0, output, out_off)?;
        utils::xor_in_place(&mut output[out_off..out_off + n], &self.chain)?;
        self.chain.copy_from_slice(input);
        Ok(n)
    }
}

impl<C: BlockCipher> BlockCipher for CbcBlockCipher<C> {
    fn algorithm_name(&self) -> String {
        format!("{}/CBC", self.cipher.algorithm_name())
    }

    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn init(&mut self, direction: Direction, params: CipherParameters) -> Result<()> {
        let (key, iv) = match params {
            CipherParameters::WithIv(params) => {
                if params.iv().len() != self.block_size() {
                    return Err(CipherError::InvalidParameter(format!(
                        "initialisation vector must be {} bytes, got {}",
                        self.block_size(),
                        params.iv().len()
                    )));
                }
                (params.parameters().clone(), Some(params.iv().to_vec()))
            }
            // A bare key keeps whatever IV was set before.
            CipherParameters::Key(key) => (key, None),
        };

        self.cipher.init(direction, key.into())?;
        if let Some(iv) = iv {
            self.iv = iv;
        }
        self.direction = Some(direction);
        self.chain.copy_from_slice(&self.iv);

        debug!(
            algorithm = %self.algorithm_name(),
            %direction,
            "CBC cipher initialised"
        );
        Ok(())
    }

    fn process_block(
        &mut self,
        input: &[u8],
        in_off: usize,
        output: &mut [u8],
        out_off: usize,
    ) -> Result<usize> {
        let block_size = self.block_size();
        utils::check_block_bounds(input.len(), in_off, output.len(), out_off, block_size)?;

        let direction = self.direction.ok_or_else(|| {
            CipherError::IllegalState(format!("{} not initialised", self.algorithm_name()))
        })?;

        let input = &input[in_off..in_off + block_size];
        match direction {
            Direction::Encrypt => self.encrypt_block(input, output, out_off),
            Direction::Decrypt => self.decrypt_block(input, output, out_off),
        }
    }

    fn reset(&mut self) {
        if self.direction.is_none() {
            return;
        }

        self.chain.copy_from_slice(&self.iv);
        self.cipher.reset();
        debug!(algorithm = %self.algorithm_name(), "CBC cipher reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DummyEngine, KeyParameter, ParametersWithIv};

    const KEY: &[u8] = b"test-key-16-byte";
    const IV: &[u8] = b"initialization16";

    fn cbc(direction: Direction) -> CbcBlockCipher<DummyEngine> {
        let mut cipher = CbcBlockCipher::new(DummyEngine::new(16).unwrap());
        cipher
            .init(
                direction,
                ParametersWithIv::new(KeyParameter::new(KEY), IV).into(),
            )
            .unwrap();
        cipher
    }

    fn run(cipher: &mut CbcBlockCipher<DummyEngine>, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; data.len()];
        for off in (0..data.len()).step_by(16) {
            cipher.process_block(data, off, &mut out, off).unwrap();
        }
        out
    }

    #[test]
    fn round_trip() {
        let plaintext = b"CBC round trip over three blocks of data!!!!!!!!";
        assert_eq!(plaintext.len(), 48);

        let ciphertext = run(&mut cbc(Direction::Encrypt), plaintext);
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = run(&mut cbc(Direction::Decrypt), &ciphertext);
        assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn identical_blocks_encrypt_differently() {
        let plaintext = [0x42u8; 32];
        let ciphertext = run(&mut cbc(Direction::Encrypt), &plaintext);
        assert_ne!(&ciphertext[..16], &ciphertext[16..]);
    }

    #[test]
    fn first_block_matches_manual_chaining() {
        let plaintext = [0x11u8; 16];

        let mut xored = plaintext;
        utils::xor_in_place(&mut xored, IV).unwrap();
        let mut engine = DummyEngine::new(16).unwrap();
        engine
            .init(Direction::Encrypt, KeyParameter::new(KEY).into())
            .unwrap();
        let mut expected = [0u8; 16];
        engine.process_block(&xored, 0, &mut expected, 0).unwrap();

        assert_eq!(run(&mut cbc(Direction::Encrypt), &plaintext), expected);
    }

    #[test]
    fn known_answer_small_blocks() {
        let iv = hex::decode("01020304").unwrap();
        let params = || ParametersWithIv::new(KeyParameter::new(&[0x01]), &iv);

        let mut enc = CbcBlockCipher::new(DummyEngine::new(4).unwrap());
        enc.init(Direction::Encrypt, params().into()).unwrap();
        let plaintext = hex::decode("0010ff8000000000").unwrap();
        let mut ciphertext = vec![0u8; 8];
        enc.process_block(&plaintext, 0, &mut ciphertext, 0).unwrap();
        enc.process_block(&plaintext, 4, &mut ciphertext, 4).unwrap();
        assert_eq!(hex::encode(&ciphertext), "0098ef2c08cc7769");

        let mut dec = CbcBlockCipher::new(DummyEngine::new(4).unwrap());
        dec.init(Direction::Decrypt, params().into()).unwrap();
        let mut decrypted = vec![0u8; 8];
        dec.process_block(&ciphertext, 0, &mut decrypted, 0).unwrap();
        dec.process_block(&ciphertext, 4, &mut decrypted, 4).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn reset_restarts_chain_from_iv() {
        let plaintext = [0x24u8; 16];
        let mut cipher = cbc(Direction::Encrypt);

        let first = run(&mut cipher, &plaintext);
        let second = run(&mut cipher, &plaintext);
        assert_ne!(first, second);

        cipher.reset();
        assert_eq!(run(&mut cipher, &plaintext), first);
    }

    #[test]
    fn reset_before_init_is_a_no_op() {
        let mut cipher = CbcBlockCipher::new(DummyEngine::new(16).unwrap());
        cipher.reset();

        let mut out = [0u8; 16];
        let result = cipher.process_block(&[0u8; 16], 0, &mut out, 0);
        assert!(matches!(result, Err(CipherError::IllegalState(_))));
    }

    #[test]
    fn bare_key_keeps_previous_iv() {
        let plaintext = [0x99u8; 16];
        let expected = run(&mut cbc(Direction::Encrypt), &plaintext);

        let mut cipher = cbc(Direction::Encrypt);
        cipher
            .init(Direction::Encrypt, KeyParameter::new(KEY).into())
            .unwrap();
        assert_eq!(run(&mut cipher, &plaintext), expected);
    }

    #[test]
    fn wrong_iv_length_is_rejected() {
        let mut cipher = CbcBlockCipher::new(DummyEngine::new(16).unwrap());
        let result = cipher.init(
            Direction::Encrypt,
            ParametersWithIv::new(KeyParameter::new(KEY), &[0u8; 8]).into(),
        );
        assert!(matches!(result, Err(CipherError::InvalidParameter(_))));
    }

    #[test]
    fn short_output_is_data_length() {
        let mut cipher = cbc(Direction::Encrypt);
        let mut out = [0u8; 15];
        let result = cipher.process_block(&[0u8; 16], 0, &mut out, 0);
        assert!(matches!(result, Err(CipherError::DataLength(_))));
    }

    #[test]
    fn name_and_block_size_follow_inner_engine() {
        let cipher = CbcBlockCipher::new(DummyEngine::new(8).unwrap());
        assert_eq!(cipher.algorithm_name(), "Dummy/CBC");
        assert_eq!(cipher.block_size(), 8);
    }
}
