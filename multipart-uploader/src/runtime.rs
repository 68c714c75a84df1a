/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Connectivity signal consulted before and during part transfers
pub mod connectivity;

/// Exponential backoff for failed part transfers
pub mod retry;
