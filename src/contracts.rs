// On-chain action runtime for the Stories mobile app
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Stories app developers
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! ABI bindings of the contracts the app talks to.

use alloy_sol_types::sol;

sol! {
    /// Subscription plans of the Stories app.
    contract Stories {
        function plans(uint256 planId)
            external
            view
            returns (string name, uint256 priceWei, uint32 periodSecs, bool active);

        function subscribe(uint256 planId, uint256 periods) external payable;
    }
}

sol! {
    /// Todo list where every item is backed by a native currency stake.
    contract StakingTodoList {
        struct Todo {
            uint256 id;
            string description;
            bool completed;
            uint256 stakedAmount;
            address owner;
            uint256 createdAt;
        }

        function minimumStake() external view returns (uint256 amount);

        function createTodo(string description) external payable;

        function completeTodo(uint256 todoId) external;

        function getUserTodoDetails(address user) external view returns (Todo[] todos);

        function getTotalTodoCount() external view returns (uint256 count);

        function getContractBalance() external view returns (uint256 balance);
    }
}
