//! 統合テスト共通のユーティリティ
//!
//! PEM鍵やローカルのベアリモートなどのフィクスチャと、モックSSHサーバーを提供

#![allow(dead_code)]

pub mod mock_services;
pub mod test_fixtures;
